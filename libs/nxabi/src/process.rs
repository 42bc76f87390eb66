use core::fmt;
use core::num::NonZeroU64;

use serde::{Deserialize, Serialize};

/// ProcessId is stored as `NonZeroU64`, so that `Option<ProcessId>`
/// still uses only `size_of::<ProcessId>()` bytes
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct ProcessId(NonZeroU64);
impl ProcessId {
    /// Must be called only once
    pub const fn first() -> Self {
        Self(unsafe { NonZeroU64::new_unchecked(1) })
    }

    /// Only to be used for values that are known to be actual process ids,
    /// e.g. when deserializing system call results
    pub fn from_u64(value: u64) -> Self {
        Self(NonZeroU64::new(value).expect("Zero ProcessId"))
    }

    /// Only to be used by the process scheduler
    pub fn next(self) -> Self {
        Self(NonZeroU64::new(self.0.get() + 1).expect("ProcessId overflow"))
    }

    pub const fn as_u64(self) -> u64 {
        self.0.get()
    }
}
impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

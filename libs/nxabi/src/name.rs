//! Service naming rules.
//!
//! A service name is printable ASCII, at most 63 bytes, and is carried on
//! the wire as a NUL-padded 64-byte field. Names are globally unique and
//! never renamed.

use alloc::borrow::ToOwned;
use alloc::string::String;
use core::fmt;

use serde::{Deserialize, Serialize};

/// Maximum name length, excluding the NUL terminator
pub const MAX_SERVICE_NAME_BYTES: usize = 63;

/// On-wire size of a name field
pub const SERVICE_NAME_FIELD_BYTES: usize = 64;

/// Messages to this name are handled by the kernel and never enqueued
pub const CORE_SERVICE_NAME: &str = "axle.core";

/// Namespace reserved for kernel-synthesized replacement names.
/// User registrations must not collide with it.
pub const INVALID_NAME_INFIX: &str = "_invalid_service_name_";

/// The window manager, sole user of `MAP_FRAMEBUFFER`
pub const AWM_SERVICE_NAME: &str = "com.example.awm";
/// The file server, sole user of `MAP_INITRD`
pub const FILE_SERVER_SERVICE_NAME: &str = "com.example.fs";
/// The dynamic linker, allowed to use `EXEC_BUFFER`
pub const LINKER_SERVICE_NAME: &str = "com.example.linker";
/// The disk driver, allowed to use `EXEC_BUFFER`
pub const IDE_SERVICE_NAME: &str = "com.example.ide";

static_assertions::const_assert_eq!(
    MAX_SERVICE_NAME_BYTES + 1,
    SERVICE_NAME_FIELD_BYTES
);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NameError {
    Empty,
    TooLong,
    /// Contains a non-printable or non-ASCII byte
    Invalid,
    /// Collides with a kernel-reserved name or namespace
    Reserved,
}

/// A validated service name, e.g. `com.example.net`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ServiceName(String);
impl ServiceName {
    /// Checks that the name is valid and if so, returns a new ServiceName.
    /// The core service name itself is accepted; `is_core` distinguishes it.
    pub fn new(s: &str) -> Result<Self, NameError> {
        if s.is_empty() {
            return Err(NameError::Empty);
        }
        if s.len() > MAX_SERVICE_NAME_BYTES {
            return Err(NameError::TooLong);
        }
        for c in s.chars() {
            if !c.is_ascii_graphic() {
                return Err(NameError::Invalid);
            }
        }
        if s != CORE_SERVICE_NAME && s.contains(INVALID_NAME_INFIX) {
            return Err(NameError::Reserved);
        }
        Ok(Self(s.to_owned()))
    }

    /// The kernel endpoint
    pub fn core() -> Self {
        Self(CORE_SERVICE_NAME.to_owned())
    }

    pub fn is_core(&self) -> bool {
        self.0 == CORE_SERVICE_NAME
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Writes the NUL-padded wire field
    pub fn write_field(&self, out: &mut [u8]) {
        debug_assert_eq!(out.len(), SERVICE_NAME_FIELD_BYTES);
        for b in out.iter_mut() {
            *b = 0;
        }
        out[..self.0.len()].copy_from_slice(self.0.as_bytes());
    }

    /// Parses a NUL-padded wire field
    pub fn from_field(field: &[u8]) -> Result<Self, NameError> {
        debug_assert_eq!(field.len(), SERVICE_NAME_FIELD_BYTES);
        let len = field.iter().position(|b| *b == 0).unwrap_or(field.len());
        let s = core::str::from_utf8(&field[..len]).map_err(|_| NameError::Invalid)?;
        Self::new(s)
    }
}

impl fmt::Display for ServiceName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

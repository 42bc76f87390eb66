//! Address newtypes and the fixed virtual-memory conventions of the bus.
//!
//! The bus itself never walks page tables; these are the well-known
//! addresses it asks the platform to place mappings at. The offsets are
//! identical in every address space.

use serde::{Deserialize, Serialize};

use crate::message::{MAX_MESSAGE_BYTES, MESSAGE_HEADER_BYTES};

pub const PAGE_SIZE_BYTES: u64 = 0x1000;

/// Base of the per-service message delivery pool
pub const DELIVERY_POOL_BASE: VirtAddr = VirtAddr::new(0x7f80_0000_0000);

/// The pool holds exactly one message, header included
pub const DELIVERY_POOL_BYTES: u64 =
    page_align_up((MESSAGE_HEADER_BYTES + MAX_MESSAGE_BYTES) as u64);

/// Base of the shared-memory window region, distinct from heap and stack
pub const SHARED_MEMORY_BASE: VirtAddr = VirtAddr::new(0x7f00_0000_0000);

/// Minimum placement for driver physical-range mappings, and the fallback
/// region when a requested base conflicts with an existing mapping
pub const HIGH_MAPPING_BASE: VirtAddr = VirtAddr::new(0x7d00_0000_0000);

pub const fn page_align_up(value: u64) -> u64 {
    (value + PAGE_SIZE_BYTES - 1) & !(PAGE_SIZE_BYTES - 1)
}

static_assertions::const_assert_eq!(DELIVERY_POOL_BYTES % PAGE_SIZE_BYTES, 0);
static_assertions::const_assert!(
    DELIVERY_POOL_BYTES >= (MESSAGE_HEADER_BYTES + MAX_MESSAGE_BYTES) as u64
);

/// A virtual address in some process's address space
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct VirtAddr(u64);
impl VirtAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }

    pub const fn is_page_aligned(self) -> bool {
        self.0 % PAGE_SIZE_BYTES == 0
    }

    pub fn checked_add(self, offset: u64) -> Option<Self> {
        self.0.checked_add(offset).map(Self)
    }
}

/// A physical memory address
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PhysAddr(u64);
impl PhysAddr {
    pub const fn new(addr: u64) -> Self {
        Self(addr)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_page_align_up() {
        assert_eq!(page_align_up(0), 0);
        assert_eq!(page_align_up(1), PAGE_SIZE_BYTES);
        assert_eq!(page_align_up(PAGE_SIZE_BYTES), PAGE_SIZE_BYTES);
        assert_eq!(page_align_up(PAGE_SIZE_BYTES + 1), 2 * PAGE_SIZE_BYTES);
    }
}

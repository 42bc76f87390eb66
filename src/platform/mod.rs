//! Interfaces the hosting kernel provides to the bus.
//!
//! The bus never walks page tables and never owns a scheduler; it drives
//! both through these traits, in the context of the calling process.

use alloc::vec::Vec;

use bitflags::bitflags;
use nxabi::{PhysAddr, ProcessId, VirtAddr};
use nxtime::Instant;

#[cfg(test)]
pub(crate) mod mock;

bitflags! {
    /// Composable reasons a process may be suspended on
    pub struct BlockReason: u32 {
        /// A matching message arrived in the inbox
        const AWAIT_MESSAGE   = 1 << 0;
        /// A sleep deadline passed
        const AWAIT_TIMESTAMP = 1 << 1;
    }
}

/// Monotonic boot clock
pub trait Clock {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnError {
    OutOfMemory,
    InvalidImage,
}

/// Cooperative block/unblock scheduling, one platform thread per process.
///
/// The mask encodes any-of wakeup: `block` returns once any reason in the
/// mask is cleared by a matching `unblock`. `unblock` must be safe to call
/// on a running or already-runnable process; a wake delivered before the
/// target blocks is latched and cancels the target's next matching block.
/// Callers of `block` therefore have to tolerate spurious early returns
/// and re-check their wait condition.
pub trait ProcessControl {
    /// Process whose context the current call runs in, if any
    fn current_process(&self) -> Option<ProcessId>;

    /// Suspends `pid` until any reason in `reasons` is cleared
    fn block(&self, pid: ProcessId, reasons: BlockReason);

    /// Clears `reason` for `pid`, waking it if it was blocked on it
    fn unblock(&self, pid: ProcessId, reason: BlockReason);

    /// Mask `pid` is currently blocked on, empty if runnable
    fn blocked_reasons(&self, pid: ProcessId) -> BlockReason;

    /// Spawns a new process from an executable image already copied into
    /// kernel memory
    fn spawn(&self, program_name: &str, image: Vec<u8>) -> Result<ProcessId, SpawnError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapError {
    OutOfMemory,
    /// No mapping matches the given range
    NoSuchRange,
}

/// Per-process address-space manipulation.
///
/// `min_base` arguments are placement hints: the implementation returns
/// the first free page-aligned base at or above the hint, so address
/// conflicts resolve to an alternate base in the same high region.
/// Implementations update the target's page tables under that address
/// space's own lock and mark the pages user-accessible.
pub trait AddressSpaces {
    /// Allocates fresh physically-backed user-rw memory in `pid`'s space
    fn alloc_range(&self, pid: ProcessId, min_base: VirtAddr, size: u64)
        -> Result<VirtAddr, MapError>;

    /// Maps an existing physical range into `pid`'s space
    fn map_range(
        &self,
        pid: ProcessId,
        min_base: VirtAddr,
        size: u64,
        phys: PhysAddr,
    ) -> Result<VirtAddr, MapError>;

    /// Maps the physical pages backing `src_base` in `src`'s space into
    /// `dst`'s space as well
    fn copy_phys_mapping(
        &self,
        dst: ProcessId,
        src: ProcessId,
        src_base: VirtAddr,
        size: u64,
        min_base: VirtAddr,
    ) -> Result<VirtAddr, MapError>;

    /// Removes a mapping without releasing the physical backing
    fn unmap_range(&self, pid: ProcessId, base: VirtAddr, size: u64) -> Result<(), MapError>;

    /// Removes a mapping and releases the physical backing
    fn free_range(&self, pid: ProcessId, base: VirtAddr, size: u64) -> Result<(), MapError>;

    /// Allocates contiguous physical memory without mapping it
    fn alloc_phys_contiguous(&self, size: u64) -> Result<PhysAddr, MapError>;

    /// Releases physical memory allocated by `alloc_phys_contiguous`
    fn free_phys(&self, base: PhysAddr, size: u64) -> Result<(), MapError>;

    /// Copies bytes out of `pid`'s space
    fn read_bytes(&self, pid: ProcessId, base: VirtAddr, buf: &mut [u8]) -> Result<(), MapError>;

    /// Copies bytes into `pid`'s space
    fn write_bytes(&self, pid: ProcessId, base: VirtAddr, data: &[u8]) -> Result<(), MapError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Framebuffer {
    pub kind: u32,
    pub phys_base: PhysAddr,
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    pub bytes_per_pixel: u32,
    pub pixels_per_scanline: u32,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitrdImage {
    pub phys_base: PhysAddr,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapStats {
    pub phys_allocated: u64,
    pub heap_allocated: u64,
}

/// Boot-time platform resources handed out by core commands
pub trait BootEnv {
    fn framebuffer(&self) -> Framebuffer;
    fn initrd(&self) -> InitrdImage;
    fn heap_stats(&self) -> HeapStats;
}

/// Everything the bus needs from the hosting kernel
pub trait Platform: Clock + ProcessControl + AddressSpaces + BootEnv {}
impl<T: Clock + ProcessControl + AddressSpaces + BootEnv> Platform for T {}

use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use nxabi::{ProcessId, ServiceName, VirtAddr};

use super::inbox::Inbox;

/// Lifecycle of a registered service. There is no state for
/// "unregistered"; an unregistered name simply has no `Service`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryState {
    /// Accepting messages into the inbox
    Registered,
    /// Still present, but new messages divert to the pending pool.
    /// Entered when the owning process crashes with queued work.
    DeliveryDisabled,
    /// Being torn down; never exited
    Destroyed,
}

/// One half of a shared-memory pairing, stored on each of the two services
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharedRegion {
    pub peer: ServiceName,
    /// Base in the owning service's address space
    pub local_base: VirtAddr,
    /// Base of the same physical pages in the peer's address space
    pub peer_base: VirtAddr,
    pub size: u64,
}

/// Mutable service state, guarded by the per-service lock
#[derive(Debug)]
pub struct ServiceInner {
    pub state: DeliveryState,
    pub inbox: Inbox,
    /// Names to inform when this service is destroyed, one-shot
    pub death_subscribers: Vec<ServiceName>,
    pub shared_regions: Vec<SharedRegion>,
}

/// A named endpoint owned by exactly one process
#[derive(Debug)]
pub struct Service {
    name: ServiceName,
    pid: ProcessId,
    /// Base of the delivery pool in the owning process's address space
    delivery_pool: VirtAddr,
    inner: Mutex<ServiceInner>,
}
impl Service {
    pub fn new(name: ServiceName, pid: ProcessId, delivery_pool: VirtAddr) -> Arc<Self> {
        Arc::new(Self {
            name,
            pid,
            delivery_pool,
            inner: Mutex::new(ServiceInner {
                state: DeliveryState::Registered,
                inbox: Inbox::new(),
                death_subscribers: Vec::new(),
                shared_regions: Vec::new(),
            }),
        })
    }

    pub fn name(&self) -> &ServiceName {
        &self.name
    }

    pub fn pid(&self) -> ProcessId {
        self.pid
    }

    pub fn delivery_pool(&self) -> VirtAddr {
        self.delivery_pool
    }

    /// The per-service lock
    pub fn lock(&self) -> MutexGuard<'_, ServiceInner> {
        self.inner.lock()
    }
}

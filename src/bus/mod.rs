//! The bus core: registry, send/receive paths, teardown, sleep wakeups.
//!
//! All process-wide state is owned by a single [`Bus`] object which the
//! hosting kernel constructs at boot and passes to every entry point.
//!
//! Lock order: the registry lock may be held while taking the pending-pool
//! lock or a single service lock; a service lock may be held while taking
//! the sleep-queue lock. Two service locks are never held at once, and no
//! lock is ever held across a block.

use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::Mutex;

use nxabi::addr::{DELIVERY_POOL_BASE, DELIVERY_POOL_BYTES};
use nxabi::cmd::{ServiceDied, SupervisedProcessEvent};
use nxabi::message::MAX_MESSAGE_BYTES;
use nxabi::name::NameError;
use nxabi::{Message, ProcessId, ServiceName, VirtAddr};
use nxtime::Duration;

mod core_commands;
mod inbox;
mod pending;
mod registry;
pub mod result;
mod service;
mod sleep;


use self::pending::PendingPool;
use self::registry::Registry;
use self::result::{BusResult, DeliveryError, Error};
use self::service::{DeliveryState, Service};
use self::sleep::{SleepQueue, SleepRecord};
use crate::platform::{BlockReason, Platform};

pub use self::inbox::INBOX_MAX_MESSAGES;
pub use self::pending::PENDING_POOL_MAX;

/// Successful outcome of a send
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Appended to the destination's inbox
    Delivered,
    /// Destination not present (or delivery disabled); stored in the
    /// pending pool
    Queued,
}

pub struct Bus<P: Platform> {
    platform: P,
    registry: Mutex<Registry>,
    pending: Mutex<PendingPool>,
    sleeping: Mutex<SleepQueue>,
    /// Supervised child process to supervising parent service
    supervisors: Mutex<HashMap<ProcessId, ServiceName>>,
}

impl<P: Platform> Bus<P> {
    pub fn new(platform: P) -> Self {
        Self {
            platform,
            registry: Mutex::new(Registry::new()),
            pending: Mutex::new(PendingPool::new()),
            sleeping: Mutex::new(SleepQueue::new()),
            supervisors: Mutex::new(HashMap::new()),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Registers the calling process under `name`.
    ///
    /// Allocates the delivery pool, creates an empty inbox and immediately
    /// drains the pending pool for this name, FIFO, into it. A name
    /// collision is refused cleanly without touching registry state.
    pub fn register(&self, name: &str) -> BusResult<()> {
        let name = ServiceName::new(name)?;
        if name.is_core() {
            return Err(NameError::Reserved.into());
        }
        let pid = self.platform.current_process().ok_or(Error::NoProcess)?;

        let mut registry = self.registry.lock();
        if registry.by_process(pid).is_some() {
            return Err(Error::AlreadyRegistered);
        }
        if registry.by_name(&name).is_some() {
            log::warn!("register: name {} already taken", name);
            return Err(Error::NameTaken);
        }

        let pool = self
            .platform
            .alloc_range(pid, DELIVERY_POOL_BASE, DELIVERY_POOL_BYTES)
            .map_err(Error::from)?;
        let service = Service::new(name.clone(), pid, pool);
        registry.insert(Arc::clone(&service));

        // Pending drain happens under the registry lock, so a send racing
        // with this registration cannot reorder around the drained batch
        let outstanding = self.pending.lock().drain_for(&name);
        if !outstanding.is_empty() {
            log::debug!(
                "delivering {} outstanding messages to new service {}",
                outstanding.len(),
                name
            );
            let mut inner = service.lock();
            for message in outstanding {
                if inner.inbox.push(message).is_err() {
                    log::warn!("inbox of {} full during pending drain", name);
                    break;
                }
            }
        }

        log::debug!(
            "registered {} for process {} ({} services total)",
            name,
            pid,
            registry.len()
        );
        Ok(())
    }

    /// Sends `data` to the named destination on behalf of the calling
    /// process. The source name is taken from the caller's service record;
    /// the sender never chooses it.
    pub fn send(&self, dest: &str, data: &[u8]) -> BusResult<SendStatus> {
        let dest = ServiceName::new(dest)?;
        let caller = self.current_service().ok_or(Error::NotRegistered)?;
        if data.len() > MAX_MESSAGE_BYTES {
            return Err(DeliveryError::TooLarge.into());
        }
        if dest.is_core() {
            core_commands::handle(self, &caller, data)?;
            return Ok(SendStatus::Delivered);
        }
        self.route(Message::new(caller.name().clone(), dest, data.to_vec()))
    }

    /// Sends a kernel-synthesized message, reported as originating from
    /// the core name
    pub(crate) fn send_from_core(&self, dest: &ServiceName, data: Vec<u8>) -> BusResult<SendStatus> {
        self.route(Message::new(ServiceName::core(), dest.clone(), data))
    }

    /// Appends to the destination inbox, or diverts to the pending pool
    fn route(&self, message: Message) -> BusResult<SendStatus> {
        let dest_service = self.registry.lock().by_name(&message.dest);
        let service = match dest_service {
            Some(service) => service,
            None => {
                let mut pending = self.pending.lock();
                log::debug!(
                    "destination {} not registered, queueing message from {} (pool size {})",
                    message.dest,
                    message.source,
                    pending.len()
                );
                pending.enqueue(message)?;
                return Ok(SendStatus::Queued);
            },
        };

        // The service lock is held for the whole append and wake, which is
        // what keeps per-pair delivery FIFO
        let mut inner = service.lock();
        if inner.state != DeliveryState::Registered {
            drop(inner);
            log::debug!("delivery to {} disabled, queueing", message.dest);
            self.pending.lock().enqueue(message)?;
            return Ok(SendStatus::Queued);
        }
        inner.inbox.push(message)?;

        let pid = service.pid();
        self.sleeping.lock().remove_if_wake_on_message(pid);
        self.platform.unblock(pid, BlockReason::AWAIT_MESSAGE);
        Ok(SendStatus::Delivered)
    }

    /// Blocks until any message is available, then delivers it
    pub fn receive_any(&self) -> BusResult<VirtAddr> {
        self.receive(&[], None)
    }

    /// Blocks until a message from one of `sources` (empty = any) whose
    /// leading payload u32 matches `event` (if given) is available, then
    /// delivers it.
    ///
    /// Delivery copies header and payload to the base of the caller's
    /// delivery pool and returns that base; it invalidates the previously
    /// delivered message.
    pub fn receive(&self, sources: &[ServiceName], event: Option<u32>) -> BusResult<VirtAddr> {
        let pid = self.platform.current_process().ok_or(Error::NoProcess)?;
        loop {
            let service = self
                .registry
                .lock()
                .by_process(pid)
                .ok_or(Error::NotRegistered)?;
            {
                let mut inner = service.lock();
                if let Some(message) = inner.inbox.select(sources, event) {
                    let pool = service.delivery_pool();
                    self.platform
                        .write_bytes(pid, pool, &message.to_bytes())
                        .map_err(Error::from)?;
                    return Ok(pool);
                }
            }
            // Released before blocking; a send that lands in the gap has
            // already latched our wake, so the block returns immediately
            self.platform.block(pid, BlockReason::AWAIT_MESSAGE);
        }
    }

    /// Whether a `receive_any` would currently return without blocking
    pub fn has_message(&self) -> BusResult<bool> {
        let service = self.current_service().ok_or(Error::NotRegistered)?;
        let inner = service.lock();
        Ok(inner.inbox.has_message())
    }

    pub fn has_message_from(&self, source: &str) -> BusResult<bool> {
        let source = ServiceName::new(source)?;
        let service = self.current_service().ok_or(Error::NotRegistered)?;
        let inner = service.lock();
        Ok(inner.inbox.has_message_from(&source))
    }

    /// Whether a named service is currently registered
    pub fn query_service(&self, name: &str) -> bool {
        match ServiceName::new(name) {
            Ok(name) => self.registry.lock().by_name(&name).is_some(),
            Err(_) => false,
        }
    }

    /// Stops inbox delivery for the process's service; messages sent to
    /// the name from here on go to the pending pool. Used when a service
    /// crashes but its queue should survive for a relaunch.
    pub fn disable_delivery(&self, pid: ProcessId) {
        let service = self.registry.lock().by_process(pid);
        if let Some(service) = service {
            let mut inner = service.lock();
            if inner.state == DeliveryState::Registered {
                log::debug!("disabling delivery to {}", service.name());
                inner.state = DeliveryState::DeliveryDisabled;
            }
        }
    }

    /// Destroys the service of a terminating process: frees undelivered
    /// messages, detaches shared regions, and informs death subscribers.
    /// Called from process teardown; a no-op for processes without a
    /// service.
    pub fn teardown_process(&self, pid: ProcessId) {
        let mut registry = self.registry.lock();
        let service = match registry.remove_by_process(pid) {
            Some(service) => service,
            None => return,
        };

        let (subscribers, regions) = {
            let mut inner = service.lock();
            inner.state = DeliveryState::Destroyed;
            let undelivered = inner.inbox.clear();
            if undelivered > 0 {
                log::debug!(
                    "teardown of {}: dropping {} undelivered messages",
                    service.name(),
                    undelivered
                );
            }
            (
                core::mem::take(&mut inner.death_subscribers),
                core::mem::take(&mut inner.shared_regions),
            )
        };

        // Drop the peers' back-references; their mappings stay intact and
        // the dying side's pages go away with its address space
        for region in &regions {
            if let Some(peer) = registry.by_name(&region.peer) {
                let mut peer_inner = peer.lock();
                peer_inner
                    .shared_regions
                    .retain(|r| !(r.peer == *service.name() && r.local_base == region.peer_base));
            }
        }
        drop(registry);

        self.sleeping.lock().remove(pid);

        // Death notifications go out after the registry lock is released;
        // subscribers are names, resolved only now
        for subscriber in subscribers {
            log::debug!(
                "informing {} of the death of {}",
                subscriber,
                service.name()
            );
            let notification = ServiceDied {
                dead: service.name().clone(),
            };
            if let Err(e) = self.send_from_core(&subscriber, notification.to_bytes()) {
                log::warn!("death notification to {} failed: {:?}", subscriber, e);
            }
        }
    }

    /// Idempotent sweep waking every sleeper whose deadline has passed.
    /// Called periodically from the timer tick.
    pub fn wake_sleeping_services(&self) {
        let now = self.platform.now();
        let due = self.sleeping.lock().take_due(now);
        for record in due {
            log::trace!("waking {} at {}", record.pid, now);
            self.platform
                .unblock(record.pid, BlockReason::AWAIT_TIMESTAMP);
        }
    }

    /// Core-command sleep path. Blocks the caller after all bus locks are
    /// released.
    fn sleep(&self, pid: ProcessId, ms: u32, wake_on_message: bool) {
        let deadline = self.platform.now() + Duration::from_millis(u64::from(ms));
        let reasons = if wake_on_message {
            BlockReason::AWAIT_TIMESTAMP | BlockReason::AWAIT_MESSAGE
        } else {
            BlockReason::AWAIT_TIMESTAMP
        };
        let mut sleeping = self.sleeping.lock();
        // A process cannot issue a second sleep while suspended
        debug_assert!(!sleeping.contains(pid));
        sleeping.insert(SleepRecord {
            pid,
            deadline,
            wake_on_message,
        });
        drop(sleeping);
        self.platform.block(pid, reasons);
        // Consumed by the wake sweep or by a message arrival; this covers
        // an early wake through a latched unblock
        self.sleeping.lock().remove(pid);
    }

    fn current_service(&self) -> Option<Arc<Service>> {
        let pid = self.platform.current_process()?;
        self.registry.lock().by_process(pid)
    }

    /// Records `parent` as the supervisor of `child`
    fn set_supervisor(&self, child: ProcessId, parent: ServiceName) {
        self.supervisors.lock().insert(child, parent);
    }

    /// Kernel to supervisor-parent: a supervised child was created
    pub fn supervised_process_created(&self, child: ProcessId) {
        self.notify_supervisor(child, SupervisedProcessEvent::Created {
            pid: child.as_u64(),
        });
    }

    /// Kernel to supervisor-parent: a supervised child started executing
    pub fn supervised_process_started(&self, child: ProcessId, entry_point: u64) {
        self.notify_supervisor(child, SupervisedProcessEvent::Started { entry_point });
    }

    /// Kernel to supervisor-parent: a supervised child exited. Discards
    /// the supervision record.
    pub fn supervised_process_exited(&self, child: ProcessId, status: u64) {
        self.notify_supervisor(child, SupervisedProcessEvent::Exited { status });
        self.supervisors.lock().remove(&child);
    }

    /// Kernel to supervisor-parent: a supervised child wrote output.
    /// Long writes are split into chunks.
    pub fn supervised_process_wrote(&self, child: ProcessId, data: &[u8]) {
        for chunk in data.chunks(nxabi::cmd::SUPERVISED_WRITE_CHUNK) {
            self.notify_supervisor(child, SupervisedProcessEvent::Wrote {
                data: chunk.to_vec(),
            });
        }
    }

    fn notify_supervisor(&self, child: ProcessId, event: SupervisedProcessEvent) {
        let parent = self.supervisors.lock().get(&child).cloned();
        if let Some(parent) = parent {
            if let Err(e) = self.send_from_core(&parent, event.to_bytes()) {
                log::warn!("supervisor event for {} to {} failed: {:?}", child, parent, e);
            }
        }
    }
}

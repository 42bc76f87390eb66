use alloc::collections::VecDeque;
use alloc::vec::Vec;

use nxabi::{Message, ServiceName};

use super::result::DeliveryError;

/// Capacity of the process-wide pending pool
pub const PENDING_POOL_MAX: usize = 512;

/// Buffers messages whose destination had no registered service (or had
/// delivery disabled) at send time. Drained in FIFO order when the
/// destination registers.
#[derive(Debug)]
pub struct PendingPool {
    queue: VecDeque<Message>,
}
impl PendingPool {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn enqueue(&mut self, message: Message) -> Result<(), DeliveryError> {
        if self.queue.len() >= PENDING_POOL_MAX {
            return Err(DeliveryError::PendingPoolFull);
        }
        self.queue.push_back(message);
        Ok(())
    }

    /// Removes and returns all messages addressed to `name`, oldest first
    pub fn drain_for(&mut self, name: &ServiceName) -> Vec<Message> {
        let mut drained = Vec::new();
        let mut kept = VecDeque::with_capacity(self.queue.len());
        for message in self.queue.drain(..) {
            if message.dest == *name {
                drained.push(message);
            } else {
                kept.push_back(message);
            }
        }
        self.queue = kept;
        drained
    }

    /// Removes all entries with a matching (source, dest) pair
    pub fn flush(&mut self, source: &ServiceName, dest: &ServiceName) -> usize {
        let before = self.queue.len();
        self.queue
            .retain(|m| !(m.source == *source && m.dest == *dest));
        before - self.queue.len()
    }
}

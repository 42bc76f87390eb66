use alloc::collections::VecDeque;

use nxabi::{Message, ServiceName};

use super::result::DeliveryError;

/// A service's inbox will reject further messages once it holds this many
pub const INBOX_MAX_MESSAGES: usize = 2048;

/// Per-service FIFO of undelivered messages. All operations run under the
/// owning service's lock.
#[derive(Debug)]
pub struct Inbox {
    queue: VecDeque<Message>,
    limit: usize,
}
impl Inbox {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
            limit: INBOX_MAX_MESSAGES,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn push(&mut self, message: Message) -> Result<(), DeliveryError> {
        if self.queue.len() >= self.limit {
            return Err(DeliveryError::InboxFull);
        }
        self.queue.push_back(message);
        Ok(())
    }

    /// Removes and returns the first message (head to tail) whose source
    /// is in `sources` (empty = any source) and whose leading payload u32
    /// matches `event` if one is given. Both predicates must hold.
    pub fn select(&mut self, sources: &[ServiceName], event: Option<u32>) -> Option<Message> {
        let index = self
            .queue
            .iter()
            .position(|m| Self::matches(m, sources, event))?;
        self.queue.remove(index)
    }

    pub fn has_message(&self) -> bool {
        !self.queue.is_empty()
    }

    pub fn has_message_from(&self, source: &ServiceName) -> bool {
        self.queue.iter().any(|m| m.source == *source)
    }

    /// Drops all messages from one source, returning how many
    pub fn flush_from(&mut self, source: &ServiceName) -> usize {
        let before = self.queue.len();
        self.queue.retain(|m| m.source != *source);
        before - self.queue.len()
    }

    /// Drops everything, returning how many messages were undelivered
    pub fn clear(&mut self) -> usize {
        let count = self.queue.len();
        self.queue.clear();
        count
    }

    fn matches(message: &Message, sources: &[ServiceName], event: Option<u32>) -> bool {
        if !sources.is_empty() && !sources.contains(&message.source) {
            return false;
        }
        match event {
            // A payload shorter than 4 bytes never matches an event filter
            Some(wanted) => message.event() == Some(wanted),
            None => true,
        }
    }
}

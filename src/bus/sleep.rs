use alloc::collections::VecDeque;
use alloc::vec::Vec;

use nxabi::ProcessId;
use nxtime::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepRecord {
    pub pid: ProcessId,
    pub deadline: Instant,
    /// Set for sleep-or-message: a message arrival consumes the record
    pub wake_on_message: bool,
}

/// Sleeping services, kept sorted by wake-up time
#[derive(Debug)]
pub struct SleepQueue {
    queue: VecDeque<SleepRecord>,
}
impl SleepQueue {
    pub fn new() -> Self {
        Self {
            queue: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, record: SleepRecord) {
        let i = p_index_vecdeque(&self.queue, record.deadline);
        self.queue.insert(i, record);
    }

    pub fn contains(&self, pid: ProcessId) -> bool {
        self.queue.iter().any(|r| r.pid == pid)
    }

    pub fn remove(&mut self, pid: ProcessId) -> Option<SleepRecord> {
        let i = self.queue.iter().position(|r| r.pid == pid)?;
        self.queue.remove(i)
    }

    /// Removes the record for `pid` only if it was armed with
    /// wake-on-message. Used by the send path; plain sleepers keep their
    /// deadline.
    pub fn remove_if_wake_on_message(&mut self, pid: ProcessId) -> Option<SleepRecord> {
        let i = self
            .queue
            .iter()
            .position(|r| r.pid == pid && r.wake_on_message)?;
        self.queue.remove(i)
    }

    /// Removes and returns every record whose deadline has passed
    pub fn take_due(&mut self, now: Instant) -> Vec<SleepRecord> {
        let mut due = Vec::new();
        while let Some(front) = self.queue.front() {
            if front.deadline <= now {
                due.push(self.queue.pop_front().unwrap());
            } else {
                break;
            }
        }
        due
    }
}

/// Priority-queue-like insertion index, keyed by deadline
fn p_index_vecdeque(v: &VecDeque<SleepRecord>, deadline: Instant) -> usize {
    let mut i = 0;
    while i < v.len() {
        if v[i].deadline > deadline {
            return i;
        }
        i += 1;
    }
    v.len()
}

#[cfg(test)]
mod test {
    use super::*;

    fn record(pid: u64, deadline_ms: u64, wake_on_message: bool) -> SleepRecord {
        SleepRecord {
            pid: ProcessId::from_u64(pid),
            deadline: Instant::from_millis(deadline_ms),
            wake_on_message,
        }
    }

    #[test]
    fn test_take_due_in_deadline_order() {
        let mut queue = SleepQueue::new();
        queue.insert(record(1, 300, false));
        queue.insert(record(2, 100, false));
        queue.insert(record(3, 200, true));

        assert!(queue.take_due(Instant::from_millis(99)).is_empty());
        let due = queue.take_due(Instant::from_millis(250));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].pid, ProcessId::from_u64(2));
        assert_eq!(due[1].pid, ProcessId::from_u64(3));
        assert!(queue.contains(ProcessId::from_u64(1)));
    }

    #[test]
    fn test_deadline_is_inclusive() {
        let mut queue = SleepQueue::new();
        queue.insert(record(1, 100, false));
        assert_eq!(queue.take_due(Instant::from_millis(100)).len(), 1);
    }

    #[test]
    fn test_remove_if_wake_on_message() {
        let mut queue = SleepQueue::new();
        queue.insert(record(1, 100, false));
        queue.insert(record(2, 200, true));

        assert!(queue
            .remove_if_wake_on_message(ProcessId::from_u64(1))
            .is_none());
        assert!(queue
            .remove_if_wake_on_message(ProcessId::from_u64(2))
            .is_some());
        assert!(queue.contains(ProcessId::from_u64(1)));
        assert!(!queue.contains(ProcessId::from_u64(2)));
    }
}

//! Session-scoped record of successfully dispatched commands.

use std::collections::VecDeque;

use crate::domain::models::EventRecord;

pub const DEFAULT_CAPACITY: usize = 256;

/// Bounded, newest-first. Entries past the capacity are dropped from the
/// old end; the sequence counter keeps growing regardless.
pub struct EventLog {
    entries: VecDeque<EventRecord>,
    next_seq: u64,
    capacity: usize,
}

impl EventLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn record(&mut self, index: u8) -> EventRecord {
        let record = EventRecord {
            index,
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.entries.push_front(record);
        self.entries.truncate(self.capacity);
        record
    }

    /// Newest first.
    pub fn iter(&self) -> impl Iterator<Item = &EventRecord> {
        self.entries.iter()
    }

    pub fn latest(&self) -> Option<&EventRecord> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iteration_is_newest_first() {
        let mut log = EventLog::default();
        log.record(1);
        log.record(5);
        log.record(3);

        let indices: Vec<u8> = log.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![3, 5, 1]);
        assert_eq!(log.latest().unwrap().index, 3);
    }

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut log = EventLog::default();
        let first = log.record(7);
        let second = log.record(7);
        assert!(second.seq > first.seq);
    }

    #[test]
    fn capacity_drops_the_oldest_entries() {
        let mut log = EventLog::new(2);
        log.record(1);
        log.record(2);
        log.record(3);

        let indices: Vec<u8> = log.iter().map(|r| r.index).collect();
        assert_eq!(indices, vec![3, 2]);
        // The counter is not reset by eviction.
        assert_eq!(log.record(4).seq, 3);
    }
}

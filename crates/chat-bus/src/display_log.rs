//! Bounded history of chat lines kept for rendering.

use std::collections::VecDeque;

use crate::event::ChatEvent;

pub const DEFAULT_CAPACITY: usize = 30;

/// FIFO of the most recent chat events. The oldest entry is evicted first.
#[derive(Debug, Clone)]
pub struct DisplayLog {
    entries: VecDeque<ChatEvent>,
    capacity: usize,
}

impl Default for DisplayLog {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl DisplayLog {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, event: ChatEvent) {
        if self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(event);
    }

    pub fn extend(&mut self, events: impl IntoIterator<Item = ChatEvent>) {
        for event in events {
            self.push(event);
        }
    }

    /// The newest `limit` entries, oldest first.
    pub fn recent(&self, limit: usize) -> Vec<ChatEvent> {
        let skip = self.entries.len().saturating_sub(limit);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatEvent> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Platform;

    fn line(n: usize) -> ChatEvent {
        ChatEvent::new(Platform::Twitch, "user", &n.to_string()).unwrap()
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut log = DisplayLog::with_capacity(3);
        log.extend((0..5).map(line));
        assert_eq!(log.len(), 3);
        let texts: Vec<_> = log.iter().map(|e| e.text().to_string()).collect();
        assert_eq!(texts, vec!["2", "3", "4"]);
    }

    #[test]
    fn recent_returns_tail_in_order() {
        let mut log = DisplayLog::default();
        log.extend((0..10).map(line));
        let tail: Vec<_> = log.recent(2).into_iter().map(|e| e.text().to_string()).collect();
        assert_eq!(tail, vec!["8", "9"]);
        assert_eq!(log.recent(100).len(), 10);
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let mut log = DisplayLog::with_capacity(0);
        log.push(line(1));
        log.push(line(2));
        assert_eq!(log.capacity(), 1);
        assert_eq!(log.recent(5)[0].text(), "2");
    }
}

use super::{Event, EventAction, VirtualTime};
use std::collections::BinaryHeap;

/// Priority given to events scheduled without an explicit one.
pub const DEFAULT_PRIORITY: i32 = 1;

/// Time-ordered event queue with FIFO tie-breaking.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Event>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, time: VirtualTime, priority: i32, action: EventAction) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Event {
            time,
            priority,
            seq,
            action,
        });
    }

    /// Pop the earliest event if it is due at or before `until`.
    pub fn pop_due(&mut self, until: VirtualTime) -> Option<Event> {
        if self.heap.peek()?.time > until {
            return None;
        }
        self.heap.pop()
    }

    pub fn peek_time(&self) -> Option<VirtualTime> {
        self.heap.peek().map(|e| e.time)
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    /// Pending events in execution order.
    pub fn pending(&self) -> Vec<&Event> {
        let mut events: Vec<&Event> = self.heap.iter().collect();
        events.sort_by(|a, b| b.cmp(a));
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::NodeId;

    fn finish(node: &str) -> EventAction {
        EventAction::FinishProcessing {
            node: NodeId::from(node),
        }
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut queue = EventQueue::new();
        queue.push(VirtualTime::from_secs(3), DEFAULT_PRIORITY, finish("c"));
        queue.push(VirtualTime::from_secs(1), DEFAULT_PRIORITY, finish("a"));
        queue.push(VirtualTime::from_secs(2), DEFAULT_PRIORITY, finish("b"));

        let order: Vec<_> = std::iter::from_fn(|| queue.pop_due(VirtualTime::from_secs(10)))
            .map(|e| e.action)
            .collect();
        assert_eq!(order, vec![finish("a"), finish("b"), finish("c")]);
    }

    #[test]
    fn test_equal_times_are_fifo() {
        let mut queue = EventQueue::new();
        for name in ["first", "second", "third", "fourth"] {
            queue.push(VirtualTime::from_secs(1), DEFAULT_PRIORITY, finish(name));
        }
        let order: Vec<_> = std::iter::from_fn(|| queue.pop_due(VirtualTime::from_secs(1)))
            .map(|e| e.action)
            .collect();
        assert_eq!(
            order,
            vec![finish("first"), finish("second"), finish("third"), finish("fourth")]
        );
    }

    #[test]
    fn test_priority_breaks_ties_before_sequence() {
        let mut queue = EventQueue::new();
        queue.push(VirtualTime::from_secs(1), 5, finish("low"));
        queue.push(VirtualTime::from_secs(1), 0, finish("high"));
        assert_eq!(queue.pending()[0].action, finish("high"));
        assert_eq!(queue.pop_due(VirtualTime::from_secs(1)).unwrap().action, finish("high"));
    }

    #[test]
    fn test_pop_due_respects_boundary() {
        let mut queue = EventQueue::new();
        queue.push(VirtualTime::from_secs(2), DEFAULT_PRIORITY, finish("x"));
        assert!(queue.pop_due(VirtualTime::from_millis(1999)).is_none());
        assert!(queue.pop_due(VirtualTime::from_secs(2)).is_some());
        assert!(queue.is_empty());
    }
}

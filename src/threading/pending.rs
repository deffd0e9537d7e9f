//! Deferred-resolution buffer
//!
//! Nodes whose reference headers still have to be turned into edges. A node
//! queued twice is resolved once; resolution order follows first arrival.

use std::collections::HashSet;

use crate::message::MessageId;

#[derive(Debug, Clone, Default)]
pub struct PendingQueue {
    order: Vec<MessageId>,
    queued: HashSet<MessageId>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `id`; returns false when it was already waiting
    pub fn enqueue(&mut self, id: MessageId) -> bool {
        if !self.queued.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.queued.contains(id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Take every queued id, leaving the queue empty
    pub fn drain(&mut self) -> Vec<MessageId> {
        self.queued.clear();
        std::mem::take(&mut self.order)
    }
}

//! Thread node data structures
//!
//! A node represents one Message-ID in the thread graph. It holds every
//! concrete copy of that message seen so far (the same message can live in
//! several folders) or none at all, in which case the node is a dummy
//! standing in for a message that was referenced but not found yet.

use std::fmt;

use serde::Serialize;

use crate::message::{Message, MessageId};

/// Confidence grade of a parent link.
///
/// Ordered so that a stronger link compares greater: `Reply > Reference > Guess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    /// Reserved for heuristics; weakest
    Guess,
    /// Inferred from the order of a References header
    Reference,
    /// Named explicitly by In-Reply-To; never replaced once set
    Reply,
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Quality::Guess => "GUESS",
            Quality::Reference => "REFERENCE",
            Quality::Reply => "REPLY",
        };
        f.write_str(label)
    }
}

/// Result of asserting a parent link with `ThreadIndex::follows`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The parent was set (or confirmed with a stronger grade)
    Attached,
    /// Accepted but ignored: an equal or stronger link already exists
    Kept,
    /// Would create a cycle or a reversed duplicate edge
    Rejected,
}

impl LinkOutcome {
    pub fn is_rejected(self) -> bool {
        self == LinkOutcome::Rejected
    }
}

/// A node in the thread graph.
///
/// Nodes are owned by `ThreadIndex` and refer to each other only by id.
/// The quality of an edge is stored once, on the child's `parent` field;
/// `children` is the mirror kept for downward walks.
#[derive(Debug, Clone)]
pub struct ThreadNode<M> {
    id: MessageId,
    instances: Vec<M>,
    parent: Option<(MessageId, Quality)>,
    children: Vec<MessageId>,
    discovered: u64,
}

impl<M: Message> ThreadNode<M> {
    /// Create a dummy node (no instances yet)
    pub(crate) fn new_dummy(id: MessageId, discovered: u64) -> Self {
        ThreadNode {
            id,
            instances: Vec::new(),
            parent: None,
            children: Vec::new(),
            discovered,
        }
    }

    pub fn id(&self) -> &MessageId {
        &self.id
    }

    /// Every concrete copy of this message, in arrival order
    pub fn instances(&self) -> &[M] {
        &self.instances
    }

    /// The representative copy: the first one not flagged deleted, or the
    /// first one when all are deleted. `None` for a dummy.
    pub fn message(&self) -> Option<&M> {
        self.instances
            .iter()
            .find(|m| !m.is_deleted())
            .or_else(|| self.instances.first())
    }

    pub fn timestamp(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        self.message().and_then(|m| m.timestamp())
    }

    pub fn is_dummy(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn parent(&self) -> Option<(&MessageId, Quality)> {
        self.parent.as_ref().map(|(id, quality)| (id, *quality))
    }

    pub fn parent_id(&self) -> Option<&MessageId> {
        self.parent.as_ref().map(|(id, _)| id)
    }

    pub fn quality(&self) -> Option<Quality> {
        self.parent.as_ref().map(|(_, quality)| *quality)
    }

    pub fn children(&self) -> &[MessageId] {
        &self.children
    }

    pub fn has_child(&self, id: &MessageId) -> bool {
        self.children.contains(id)
    }

    /// Creation sequence number inside the owning index; used to keep
    /// enumeration stable.
    pub fn discovered(&self) -> u64 {
        self.discovered
    }

    /// Add a concrete copy of this message. Edges are untouched, so a dummy
    /// becoming real keeps its place in the thread.
    pub fn add_instance(&mut self, message: M) {
        if self.instances.is_empty() {
            self.instances = vec![message];
        } else {
            self.instances.push(message);
        }
    }

    /// Remove every copy equal to `message`; returns how many were removed.
    pub fn remove_instance(&mut self, message: &M) -> usize {
        let before = self.instances.len();
        self.instances.retain(|m| m != message);
        before - self.instances.len()
    }

    /// Record `child` as a follow-up (avoiding duplicates)
    pub(crate) fn add_child(&mut self, child: MessageId) {
        if !self.children.contains(&child) {
            self.children.push(child);
        }
    }

    pub(crate) fn remove_child(&mut self, child: &MessageId) {
        self.children.retain(|id| id != child);
    }

    pub(crate) fn set_parent(&mut self, parent: MessageId, quality: Quality) {
        self.parent = Some((parent, quality));
    }
}

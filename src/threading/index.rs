//! Message-ID to node mapping
//!
//! The index is the only owner of thread nodes. Everything else refers to a
//! node by its `MessageId`, so re-parenting and cleanup never leave dangling
//! references behind.

use std::collections::{HashMap, HashSet};

use crate::message::{Message, MessageId};

use super::node::{LinkOutcome, Quality, ThreadNode};

/// Arena of thread nodes keyed by Message-ID.
#[derive(Debug, Clone)]
pub struct ThreadIndex<M> {
    nodes: HashMap<MessageId, ThreadNode<M>>,
    next_sequence: u64,
}

impl<M: Message> Default for ThreadIndex<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Message> ThreadIndex<M> {
    pub fn new() -> Self {
        ThreadIndex {
            nodes: HashMap::new(),
            next_sequence: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &MessageId) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &MessageId) -> Option<&ThreadNode<M>> {
        self.nodes.get(id)
    }

    pub(crate) fn get_mut(&mut self, id: &MessageId) -> Option<&mut ThreadNode<M>> {
        self.nodes.get_mut(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ThreadNode<M>> {
        self.nodes.values()
    }

    /// Create an instance-free node for `id`.
    ///
    /// Returns the existing node untouched when `id` is already indexed.
    pub fn create_dummy(&mut self, id: MessageId) -> &mut ThreadNode<M> {
        let sequence = &mut self.next_sequence;
        self.nodes.entry(id).or_insert_with_key(|id| {
            let node = ThreadNode::new_dummy(id.clone(), *sequence);
            *sequence += 1;
            node
        })
    }

    /// Parentless nodes in discovery order
    pub fn roots(&self) -> Vec<&ThreadNode<M>> {
        let mut roots: Vec<&ThreadNode<M>> = self
            .nodes
            .values()
            .filter(|node| node.parent().is_none())
            .collect();
        roots.sort_by_key(|node| node.discovered());
        roots
    }

    /// Walk from `id` up to its root, starting with `id` itself.
    pub fn ancestors<'a>(&'a self, id: &MessageId) -> Ancestors<'a, M> {
        Ancestors {
            index: self,
            current: self.nodes.get(id),
            visited: HashSet::new(),
        }
    }

    /// Assert that `child` follows `candidate` with the given quality.
    ///
    /// The link is rejected when `child` is `candidate` or one of its
    /// ancestors (cycle), or when `candidate` is already a direct child of
    /// `child` (the same edge in reverse, typical of reordered References).
    /// Otherwise a missing parent is always set, an existing `Reply` link is
    /// never replaced, and any other existing link is replaced when the new
    /// quality is at least as strong.
    ///
    /// When the parent changes, `child` is detached from the previous
    /// parent's children. The new parent's children are updated separately by
    /// [`followed_by`](Self::followed_by).
    pub fn follows(
        &mut self,
        child_id: &MessageId,
        candidate_id: &MessageId,
        quality: Quality,
    ) -> LinkOutcome {
        if !self.contains(child_id) || !self.contains(candidate_id) {
            log::debug!(
                "link {} -> {} refers to an unindexed node, ignoring",
                child_id,
                candidate_id
            );
            return LinkOutcome::Rejected;
        }

        if detect_cycle_in_ancestry(self, child_id, candidate_id) {
            log::trace!("rejecting {} -> {}: cycle", child_id, candidate_id);
            return LinkOutcome::Rejected;
        }

        let Some(child) = self.nodes.get(child_id) else {
            return LinkOutcome::Rejected;
        };

        if child.has_child(candidate_id) {
            log::trace!(
                "rejecting {} -> {}: reversed edge",
                child_id,
                candidate_id
            );
            return LinkOutcome::Rejected;
        }

        let previous = child.parent().map(|(id, existing)| (id.clone(), existing));
        let replace = match &previous {
            None => true,
            Some((_, Quality::Reply)) => false,
            Some((_, existing)) => quality >= *existing,
        };

        if !replace {
            return LinkOutcome::Kept;
        }

        if let Some((old_parent, _)) = &previous {
            if old_parent != candidate_id {
                if let Some(old) = self.nodes.get_mut(old_parent) {
                    old.remove_child(child_id);
                }
            }
        }

        if let Some(child) = self.nodes.get_mut(child_id) {
            child.set_parent(candidate_id.clone(), quality);
        }

        log::trace!("linked {} -> {} ({})", child_id, candidate_id, quality);
        LinkOutcome::Attached
    }

    /// Record `child_id` in the children of `parent_id` (idempotent).
    pub fn followed_by(&mut self, parent_id: &MessageId, child_id: &MessageId) {
        if let Some(parent) = self.nodes.get_mut(parent_id) {
            parent.add_child(child_id.clone());
        }
    }

    /// `follows` plus the children mirror when the link was attached
    pub fn link(
        &mut self,
        child_id: &MessageId,
        parent_id: &MessageId,
        quality: Quality,
    ) -> LinkOutcome {
        let outcome = self.follows(child_id, parent_id, quality);
        if outcome == LinkOutcome::Attached {
            self.followed_by(parent_id, child_id);
        }
        outcome
    }

    /// Delete `root` and everything below it; returns the number of nodes
    /// removed.
    pub fn remove_subtree(&mut self, root: &MessageId) -> usize {
        let ids = super::traversal::subtree_ids(self, root);

        if let Some(parent_id) = self.nodes.get(root).and_then(|n| n.parent_id().cloned()) {
            if let Some(parent) = self.nodes.get_mut(&parent_id) {
                parent.remove_child(root);
            }
        }

        let mut removed = 0;
        for id in ids {
            if self.nodes.remove(&id).is_some() {
                removed += 1;
            }
        }
        removed
    }
}

/// Iterator over a node and its ancestors.
///
/// Stops early if the parent chain loops back on itself, which the linking
/// rules never produce.
pub struct Ancestors<'a, M> {
    index: &'a ThreadIndex<M>,
    current: Option<&'a ThreadNode<M>>,
    visited: HashSet<&'a MessageId>,
}

impl<'a, M: Message> Iterator for Ancestors<'a, M> {
    type Item = &'a ThreadNode<M>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.current.take()?;
        if !self.visited.insert(node.id()) {
            return None;
        }
        self.current = node.parent_id().and_then(|id| self.index.get(id));
        Some(node)
    }
}

/// Check if linking a child to a parent would create a cycle
///
/// ## Algorithm
///
/// Starting from the proposed parent, walk up the tree following parent
/// links. If we encounter the child anywhere in this chain, linking would
/// create a cycle. A visited set stops the walk on a chain that already
/// loops.
///
/// ## Arguments
///
/// * `index` - Thread index holding the current links
/// * `child_message_id` - Node that would get the new parent
/// * `parent_message_id` - Proposed parent
///
/// ## Returns
///
/// `true` when the child is on the parent's ancestor chain (the parent
/// itself included) or that chain already loops; `false` when the link is
/// safe.
///
/// ## Example
///
/// ```text
/// Current tree:  A → B → C
///
/// Trying to link: A under C (would create cycle A → B → C → A)
/// Result: true (cycle detected)
///
/// Trying to link: D under C (D is not in chain)
/// Result: false (safe to link)
/// ```
pub fn detect_cycle_in_ancestry<M: Message>(
    index: &ThreadIndex<M>,
    child_message_id: &MessageId,
    parent_message_id: &MessageId,
) -> bool {
    let mut visited_message_ids = HashSet::new();
    let mut current_message_id = Some(parent_message_id);

    while let Some(msg_id) = current_message_id {
        // A loop in the existing chain counts as a cycle too
        if !visited_message_ids.insert(msg_id) {
            return true;
        }

        if msg_id == child_message_id {
            return true;
        }

        current_message_id = index.get(msg_id).and_then(|node| node.parent_id());
    }

    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestMessage;

    fn id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    fn index_with(ids: &[&str]) -> ThreadIndex<TestMessage> {
        let mut index = ThreadIndex::new();
        for raw in ids {
            index.create_dummy(id(raw));
        }
        index
    }

    #[test]
    fn test_no_cycle_simple_chain() {
        // Setup: A → B → C
        let mut index = index_with(&["A", "B", "C", "D"]);
        index.link(&id("B"), &id("A"), Quality::Reply);
        index.link(&id("C"), &id("B"), Quality::Reply);

        assert!(!detect_cycle_in_ancestry(&index, &id("D"), &id("C")));
    }

    #[test]
    fn test_cycle_detected() {
        let mut index = index_with(&["A", "B", "C"]);
        index.link(&id("B"), &id("A"), Quality::Reply);
        index.link(&id("C"), &id("B"), Quality::Reply);

        assert!(detect_cycle_in_ancestry(&index, &id("A"), &id("C")));
    }

    #[test]
    fn test_self_loop() {
        let mut index = index_with(&["A"]);

        assert!(detect_cycle_in_ancestry(&index, &id("A"), &id("A")));
        assert_eq!(
            index.follows(&id("A"), &id("A"), Quality::Reply),
            LinkOutcome::Rejected
        );
        assert!(index.get(&id("A")).unwrap().parent().is_none());
    }

    #[test]
    fn test_create_dummy_is_idempotent() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("a@x"));
        index.create_dummy(id("b@x"));
        index
            .create_dummy(id("a@x"))
            .add_instance(TestMessage::new("a@x"));

        assert_eq!(index.len(), 2);
        assert!(!index.get(&id("a@x")).unwrap().is_dummy());
        assert_eq!(index.get(&id("b@x")).unwrap().discovered(), 1);
    }

    #[test]
    fn test_reversed_edge_rejected() {
        let mut index = index_with(&["A", "B"]);
        index.link(&id("B"), &id("A"), Quality::Guess);

        // A already has B as child; making A follow B is refused
        assert_eq!(
            index.link(&id("A"), &id("B"), Quality::Reply),
            LinkOutcome::Rejected
        );
        assert!(index.get(&id("A")).unwrap().parent().is_none());
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut index = index_with(&["A", "B", "C"]);
        index.link(&id("C"), &id("A"), Quality::Guess);
        assert_eq!(
            index.link(&id("C"), &id("B"), Quality::Reference),
            LinkOutcome::Attached
        );

        assert!(index.get(&id("A")).unwrap().children().is_empty());
        assert_eq!(index.get(&id("B")).unwrap().children(), &[id("C")]);
        assert_eq!(
            index.get(&id("C")).unwrap().parent(),
            Some((&id("B"), Quality::Reference))
        );
    }

    #[test]
    fn test_guess_does_not_replace_reference() {
        let mut index = index_with(&["A", "B", "C"]);
        index.link(&id("C"), &id("A"), Quality::Reference);

        assert_eq!(
            index.link(&id("C"), &id("B"), Quality::Guess),
            LinkOutcome::Kept
        );
        assert_eq!(index.get(&id("C")).unwrap().parent_id(), Some(&id("A")));
        assert!(index.get(&id("B")).unwrap().children().is_empty());
    }

    #[test]
    fn test_reply_is_terminal() {
        let mut index = index_with(&["A", "B", "C"]);
        index.link(&id("C"), &id("A"), Quality::Reply);

        assert_eq!(
            index.link(&id("C"), &id("B"), Quality::Reply),
            LinkOutcome::Kept
        );
        assert_eq!(
            index.get(&id("C")).unwrap().parent(),
            Some((&id("A"), Quality::Reply))
        );
    }

    #[test]
    fn test_remove_subtree() {
        let mut index = index_with(&["A", "B", "C", "D"]);
        index.link(&id("B"), &id("A"), Quality::Reply);
        index.link(&id("C"), &id("B"), Quality::Reply);

        assert_eq!(index.remove_subtree(&id("B")), 2);
        assert!(index.contains(&id("A")));
        assert!(index.contains(&id("D")));
        assert!(index.get(&id("A")).unwrap().children().is_empty());
    }

    #[test]
    fn test_ancestors_and_roots() {
        let mut index = index_with(&["A", "B", "C", "D"]);
        index.link(&id("B"), &id("A"), Quality::Reply);
        index.link(&id("C"), &id("B"), Quality::Reply);

        let chain: Vec<&str> = index.ancestors(&id("C")).map(|n| n.id().as_str()).collect();
        assert_eq!(chain, vec!["C", "B", "A"]);

        let roots: Vec<&str> = index.roots().iter().map(|n| n.id().as_str()).collect();
        assert_eq!(roots, vec!["A", "D"]);
    }
}

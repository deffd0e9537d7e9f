//! Tree traversal utilities for thread nodes
//!
//! Functions for walking a thread downwards from one node. All of them use
//! an explicit stack instead of recursion so that very deep threads cannot
//! overflow the call stack.

use chrono::{DateTime, Utc};

use crate::message::{Message, MessageId};

use super::index::ThreadIndex;

/// Every id in the subtree rooted at `root`, in depth-first pre-order.
///
/// ## Algorithm
///
/// Iterative depth-first search with an explicit stack. Children are pushed
/// in reverse so they come off the stack in their stored order.
///
/// ## Arguments
///
/// * `index` - Thread index holding the nodes
/// * `root` - Message ID to start traversal from
///
/// ## Returns
///
/// Ids of `root` and every descendant, dummies included. Empty when `root`
/// is not indexed.
///
/// ## Example
///
/// ```text
/// A
/// ├── B
/// │   └── D
/// └── C
///
/// subtree_ids(A) = [A, B, D, C]
/// ```
pub fn subtree_ids<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> Vec<MessageId> {
    let mut collected = Vec::new();
    let mut search_stack = vec![root.clone()];

    while let Some(current) = search_stack.pop() {
        if let Some(node) = index.get(&current) {
            // Reverse so children are visited left to right
            for child in node.children().iter().rev() {
                search_stack.push(child.clone());
            }
            collected.push(current);
        }
    }

    collected
}

/// Ids of the dummy nodes (holes) below and including `root`
pub fn collect_dummies<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> Vec<MessageId> {
    subtree_ids(index, root)
        .into_iter()
        .filter(|id| index.get(id).is_some_and(|node| node.is_dummy()))
        .collect()
}

/// Whether any node in the subtree still holds a concrete message
pub fn subtree_has_instances<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> bool {
    let mut search_stack = vec![root];

    while let Some(current) = search_stack.pop() {
        if let Some(node) = index.get(current) {
            if !node.is_dummy() {
                return true;
            }
            search_stack.extend(node.children().iter());
        }
    }

    false
}

/// Number of real messages in the subtree (each node counts once, however
/// many copies it has)
pub fn number_of_messages<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> usize {
    subtree_ids(index, root)
        .iter()
        .filter(|id| index.get(id).is_some_and(|node| !node.is_dummy()))
        .count()
}

/// Collect all real messages in a thread with their depth values
///
/// ## Algorithm
///
/// Iterative depth-first search with an explicit stack. Each stack entry
/// holds (message_id, depth_in_tree).
///
/// ## Arguments
///
/// * `index` - Thread index holding the nodes
/// * `root` - Message ID to start traversal from
/// * `starting_depth` - Depth given to `root` (usually 0, or -1 for a dummy root)
///
/// ## Returns
///
/// `(message_id, depth)` pairs in depth-first pre-order, real messages only.
///
/// ## Depth Handling
///
/// - Real messages: depth is the current depth value
/// - Dummies: not returned, but their children still get depth + 1
/// - For dummy roots: start at -1 so the first real children get depth 0
pub fn collect_thread_members<M: Message>(
    index: &ThreadIndex<M>,
    root: &MessageId,
    starting_depth: i32,
) -> Vec<(MessageId, i32)> {
    let mut collected_members = Vec::new();
    let mut traversal_stack = vec![(root.clone(), starting_depth)];

    while let Some((current, depth)) = traversal_stack.pop() {
        if let Some(node) = index.get(&current) {
            for child in node.children().iter().rev() {
                traversal_stack.push((child.clone(), depth + 1));
            }
            if !node.is_dummy() {
                collected_members.push((current, depth));
            }
        }
    }

    collected_members
}

/// Every node with its depth, dummies included
pub fn collect_with_depth<M: Message>(
    index: &ThreadIndex<M>,
    root: &MessageId,
) -> Vec<(MessageId, usize)> {
    let mut collected = Vec::new();
    let mut traversal_stack = vec![(root.clone(), 0usize)];

    while let Some((current, depth)) = traversal_stack.pop() {
        if let Some(node) = index.get(&current) {
            for child in node.children().iter().rev() {
                traversal_stack.push((child.clone(), depth + 1));
            }
            collected.push((current, depth));
        }
    }

    collected
}

/// Estimated start time of the thread below `root`.
///
/// A real node reports its own timestamp. A dummy has none of its own and
/// reports the earliest estimate among its children, which is `None` when
/// no descendant carries a timestamp.
pub fn start_time_estimate<M: Message>(
    index: &ThreadIndex<M>,
    root: &MessageId,
) -> Option<DateTime<Utc>> {
    let node = index.get(root)?;
    if !node.is_dummy() {
        return node.timestamp();
    }

    // Only descend through dummies: a real child answers for its subtree
    let mut earliest: Option<DateTime<Utc>> = None;
    let mut search_stack: Vec<&MessageId> = node.children().iter().collect();

    while let Some(current) = search_stack.pop() {
        let Some(child) = index.get(current) else {
            continue;
        };

        if child.is_dummy() {
            search_stack.extend(child.children().iter());
            continue;
        }

        if let Some(stamp) = child.timestamp() {
            earliest = Some(earliest.map_or(stamp, |e| e.min(stamp)));
        }
    }

    earliest
}

/// Latest timestamp found anywhere in the subtree
pub fn end_time_estimate<M: Message>(
    index: &ThreadIndex<M>,
    root: &MessageId,
) -> Option<DateTime<Utc>> {
    subtree_ids(index, root)
        .iter()
        .filter_map(|id| index.get(id).and_then(|node| node.timestamp()))
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestMessage, ts};
    use crate::threading::node::Quality;

    fn id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    /// A (dummy) → B → C, A → D (dummy) → E
    fn sample_index() -> ThreadIndex<TestMessage> {
        let mut index = ThreadIndex::new();
        for raw in ["A", "B", "C", "D", "E"] {
            index.create_dummy(id(raw));
        }
        for (raw, at) in [("B", 20), ("C", 30), ("E", 10)] {
            index
                .get_mut(&id(raw))
                .unwrap()
                .add_instance(TestMessage::new(raw).at(ts(at)));
        }
        index.link(&id("B"), &id("A"), Quality::Reply);
        index.link(&id("C"), &id("B"), Quality::Reply);
        index.link(&id("D"), &id("A"), Quality::Reply);
        index.link(&id("E"), &id("D"), Quality::Reply);
        index
    }

    #[test]
    fn test_subtree_order() {
        let index = sample_index();
        let ids: Vec<String> = subtree_ids(&index, &id("A"))
            .iter()
            .map(|i| i.to_string())
            .collect();
        assert_eq!(ids, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn test_subtree_of_unknown_root() {
        let index = sample_index();
        assert!(subtree_ids(&index, &id("Z")).is_empty());
        assert!(collect_thread_members(&index, &id("Z"), 0).is_empty());
    }

    #[test]
    fn test_collect_from_real_root() {
        let index = sample_index();
        assert_eq!(
            collect_thread_members(&index, &id("B"), 0),
            vec![(id("B"), 0), (id("C"), 1)]
        );
        // Under the dummy D, E still sits one level down
        assert_eq!(collect_thread_members(&index, &id("D"), 0), vec![(id("E"), 1)]);
    }

    #[test]
    fn test_collect_dummies() {
        let index = sample_index();
        assert_eq!(collect_dummies(&index, &id("A")), vec![id("A"), id("D")]);
        assert!(collect_dummies(&index, &id("B")).is_empty());
    }

    #[test]
    fn test_collect_with_phantom() {
        let index = sample_index();
        let members = collect_thread_members(&index, &id("A"), -1);

        assert_eq!(
            members,
            vec![(id("B"), 0), (id("C"), 1), (id("E"), 1)]
        );
        assert_eq!(number_of_messages(&index, &id("A")), 3);
    }

    #[test]
    fn test_time_estimates() {
        let index = sample_index();

        // Earliest real message reachable through dummies is E
        assert_eq!(start_time_estimate(&index, &id("A")), Some(ts(10)));
        assert_eq!(start_time_estimate(&index, &id("B")), Some(ts(20)));
        assert_eq!(end_time_estimate(&index, &id("A")), Some(ts(30)));
    }

    #[test]
    fn test_instance_free_subtree() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("X"));
        index.create_dummy(id("Y"));
        index.link(&id("Y"), &id("X"), Quality::Reference);

        assert!(!subtree_has_instances(&index, &id("X")));
        assert_eq!(start_time_estimate(&index, &id("X")), None);
        assert!(subtree_has_instances(&sample_index(), &id("A")));
    }
}

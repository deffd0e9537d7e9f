//! Ordering of threads and follow-ups

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

use crate::message::{Message, MessageId};

use super::index::ThreadIndex;
use super::node::ThreadNode;
use super::traversal::start_time_estimate;

/// Order timestamps ascending, missing ones last
pub fn compare_estimates(a: &Option<DateTime<Utc>>, b: &Option<DateTime<Utc>>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Sort `threads` by a key computed once per node.
///
/// The sort is stable, so nodes whose keys compare equal stay grouped in the
/// order they were given.
pub fn sort_threads<'a, M, K, E, C>(
    index: &'a ThreadIndex<M>,
    threads: Vec<&'a ThreadNode<M>>,
    estimate: E,
    compare: C,
) -> Vec<&'a ThreadNode<M>>
where
    M: Message,
    E: Fn(&ThreadIndex<M>, &ThreadNode<M>) -> K,
    C: Fn(&K, &K) -> Ordering,
{
    let mut keyed: Vec<(K, &'a ThreadNode<M>)> = threads
        .into_iter()
        .map(|node| (estimate(index, node), node))
        .collect();

    keyed.sort_by(|(a, _), (b, _)| compare(a, b));
    keyed.into_iter().map(|(_, node)| node).collect()
}

/// Children of `id` ordered by their start-time estimate
pub fn sorted_follow_ups<'a, M: Message>(
    index: &'a ThreadIndex<M>,
    id: &MessageId,
) -> Vec<&'a ThreadNode<M>> {
    let Some(node) = index.get(id) else {
        return Vec::new();
    };

    let children: Vec<&ThreadNode<M>> = node
        .children()
        .iter()
        .filter_map(|child| index.get(child))
        .collect();

    sort_threads(
        index,
        children,
        |index, child| start_time_estimate(index, child.id()),
        compare_estimates,
    )
}

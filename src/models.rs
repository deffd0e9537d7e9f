use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::message::{Message, MessageId};
use crate::threading::ThreadIndex;
use crate::threading::node::Quality;
use crate::threading::traversal::{
    collect_thread_members, end_time_estimate, number_of_messages, start_time_estimate,
};

// ===== Thread Output Models =====

/// One real message of a thread, flattened for output.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadMember {
    pub message_id: MessageId,
    /// Depth below the thread root; holes still count as a level
    pub depth: i32,
    pub subject: Option<String>,
    pub author: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub parent_id: Option<MessageId>,
    pub link_quality: Option<Quality>,
    /// Number of stored copies of this message across sources
    pub copies: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub root_message_id: MessageId,
    /// The root is a hole: referenced but never found
    pub root_missing: bool,
    pub subject: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub last_date: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub members: Vec<ThreadMember>,
}

impl ThreadSummary {
    /// Summarize the thread below `root`; `None` when `root` is not indexed.
    pub fn from_index<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> Option<Self> {
        let root_node = index.get(root)?;
        let starting_depth = if root_node.is_dummy() { -1 } else { 0 };

        let members: Vec<ThreadMember> = collect_thread_members(index, root, starting_depth)
            .into_iter()
            .filter_map(|(id, depth)| {
                let node = index.get(&id)?;
                let message = node.message()?;
                Some(ThreadMember {
                    message_id: id.clone(),
                    depth,
                    subject: message.subject().map(str::to_string),
                    author: message.author().map(str::to_string),
                    date: message.timestamp(),
                    parent_id: node.parent_id().cloned(),
                    link_quality: node.quality(),
                    copies: node.instances().len(),
                })
            })
            .collect();

        // Subject of the earliest real message when the root is a hole
        let subject = members.first().and_then(|member| member.subject.clone());

        Some(ThreadSummary {
            root_message_id: root.clone(),
            root_missing: root_node.is_dummy(),
            subject,
            start_date: start_time_estimate(index, root),
            last_date: end_time_estimate(index, root),
            message_count: number_of_messages(index, root),
            members,
        })
    }
}

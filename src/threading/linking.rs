//! Turning reference headers into graph edges
//!
//! In-Reply-To names the direct parent and produces a `Reply` link. The
//! References header lists the ancestry oldest first; each entry is linked
//! to the next one and the last entry to the message itself, all with
//! `Reference` quality.
//!
//! If a message has `References: <msg1> <msg2> <msg3>` we assert:
//! - msg1 (parent) → msg2 (child)
//! - msg2 (parent) → msg3 (child)
//! - msg3 (parent) → this_message (child)
//!
//! Links to ids that are not indexed yet create dummies first. Tokens that
//! are not valid message ids are dropped.

use crate::message::{Message, MessageId, References};

use super::index::ThreadIndex;
use super::node::{LinkOutcome, Quality};

/// Counters for one resolution batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Links attached or upgraded
    pub attached: usize,
    /// Links rejected because of cycles or reversed edges
    pub rejected: usize,
    /// Dummies created for unseen ids
    pub dummies: usize,
    /// Reference tokens skipped as malformed
    pub malformed: usize,
}

impl LinkStats {
    fn record(&mut self, outcome: LinkOutcome) {
        match outcome {
            LinkOutcome::Attached => self.attached += 1,
            LinkOutcome::Rejected => self.rejected += 1,
            LinkOutcome::Kept => {}
        }
    }

    pub fn merge(&mut self, other: LinkStats) {
        self.attached += other.attached;
        self.rejected += other.rejected;
        self.dummies += other.dummies;
        self.malformed += other.malformed;
    }
}

/// Install the edges named by one message's reference headers.
pub fn link_message_references<M: Message>(
    index: &mut ThreadIndex<M>,
    msg_id: &MessageId,
    refs: &References,
) -> LinkStats {
    let mut stats = LinkStats::default();

    if let Some(token) = &refs.in_reply_to {
        match MessageId::parse(token) {
            Some(parent_id) => {
                ensure_node(index, &parent_id, &mut stats);
                stats.record(index.link(msg_id, &parent_id, Quality::Reply));
            }
            None => {
                log::debug!("{}: skipping malformed In-Reply-To `{}`", msg_id, token);
                stats.malformed += 1;
            }
        }
    }

    if refs.references.is_empty() {
        return stats;
    }

    let mut chain: Vec<MessageId> = Vec::with_capacity(refs.references.len() + 1);
    for token in &refs.references {
        match MessageId::parse(token) {
            Some(ref_id) => {
                ensure_node(index, &ref_id, &mut stats);
                chain.push(ref_id);
            }
            None => {
                log::debug!("{}: skipping malformed reference `{}`", msg_id, token);
                stats.malformed += 1;
            }
        }
    }

    if chain.last() != Some(msg_id) {
        chain.push(msg_id.clone());
    }

    for pair in chain.windows(2) {
        stats.record(index.link(&pair[1], &pair[0], Quality::Reference));
    }

    stats
}

fn ensure_node<M: Message>(index: &mut ThreadIndex<M>, id: &MessageId, stats: &mut LinkStats) {
    if !index.contains(id) {
        index.create_dummy(id.clone());
        stats.dummies += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TestMessage;

    fn id(raw: &str) -> MessageId {
        MessageId::parse(raw).unwrap()
    }

    fn refs(in_reply_to: Option<&str>, references: &[&str]) -> References {
        References {
            in_reply_to: in_reply_to.map(str::to_string),
            references: references.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_reference_chain_creates_dummies() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("c@x"));

        let stats = link_message_references(
            &mut index,
            &id("c@x"),
            &refs(None, &["<a@x>", "<b@x>"]),
        );

        assert_eq!(stats.dummies, 2);
        assert_eq!(stats.attached, 2);
        assert_eq!(
            index.get(&id("b@x")).unwrap().parent(),
            Some((&id("a@x"), Quality::Reference))
        );
        assert_eq!(
            index.get(&id("c@x")).unwrap().parent(),
            Some((&id("b@x"), Quality::Reference))
        );
    }

    #[test]
    fn test_malformed_tokens_skipped() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("c@x"));

        let stats = link_message_references(
            &mut index,
            &id("c@x"),
            &refs(Some("<>"), &["<a@x>", "<broken token>", "<b@x>"]),
        );

        assert_eq!(stats.malformed, 2);
        assert_eq!(index.len(), 3);
        assert_eq!(
            index.get(&id("c@x")).unwrap().parent_id(),
            Some(&id("b@x"))
        );
    }

    #[test]
    fn test_self_reference_is_not_duplicated() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("c@x"));

        let stats = link_message_references(
            &mut index,
            &id("c@x"),
            &refs(None, &["<a@x>", "<c@x>"]),
        );

        assert_eq!(stats.rejected, 0);
        assert_eq!(
            index.get(&id("c@x")).unwrap().parent_id(),
            Some(&id("a@x"))
        );
    }

    #[test]
    fn test_reply_beats_reference_order() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        index.create_dummy(id("c@x"));

        // In-Reply-To says a@x, References ends with b@x
        link_message_references(
            &mut index,
            &id("c@x"),
            &refs(Some("<a@x>"), &["<a@x>", "<b@x>"]),
        );

        assert_eq!(
            index.get(&id("c@x")).unwrap().parent(),
            Some((&id("a@x"), Quality::Reply))
        );
        assert_eq!(
            index.get(&id("b@x")).unwrap().parent_id(),
            Some(&id("a@x"))
        );
    }
}

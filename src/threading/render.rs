//! Plain-text rendering of a thread
//!
//! One line per node, indented by depth:
//!
//! ```text
//! 2024-03-01 09:00  Kernel panic on boot  <1@example.com>
//!   `- 2024-03-01 10:12  Re: Kernel panic on boot  <2@example.com>
//!   `- [not found]  <3@example.com>
//!     `- 2024-03-02 08:30  Re: Kernel panic on boot  <4@example.com>
//! ```

use std::fmt::Write;

use crate::message::{Message, MessageId};

use super::index::ThreadIndex;
use super::traversal::collect_with_depth;

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn render_thread<M: Message>(index: &ThreadIndex<M>, root: &MessageId) -> String {
    let mut out = String::new();

    for (id, depth) in collect_with_depth(index, root) {
        let Some(node) = index.get(&id) else {
            continue;
        };

        let indent = "  ".repeat(depth);
        let branch = if depth > 0 { "`- " } else { "" };

        let line = match node.message() {
            None => format!("[not found]  <{}>", id),
            Some(message) => {
                let date = message
                    .timestamp()
                    .map(|stamp| stamp.format(DATE_FORMAT).to_string())
                    .unwrap_or_else(|| "????-??-?? ??:??".to_string());
                let subject = message.subject().unwrap_or("(No Subject)");
                format!("{}  {}  <{}>", date, subject, id)
            }
        };

        let _ = writeln!(out, "{}{}{}", indent, branch, line);
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{TestMessage, ts};
    use crate::threading::node::Quality;

    #[test]
    fn test_render_with_dummy() {
        let mut index: ThreadIndex<TestMessage> = ThreadIndex::new();
        let root = MessageId::parse("1@x").unwrap();
        let hole = MessageId::parse("2@x").unwrap();
        let leaf = MessageId::parse("3@x").unwrap();

        index
            .create_dummy(root.clone())
            .add_instance(TestMessage::new("1@x").with_subject("Hello").at(ts(0)));
        index.create_dummy(hole.clone());
        index
            .create_dummy(leaf.clone())
            .add_instance(TestMessage::new("3@x").with_subject("Re: Hello").at(ts(3_600)));
        index.link(&hole, &root, Quality::Reference);
        index.link(&leaf, &hole, Quality::Reply);

        let rendered = render_thread(&index, &root);
        assert_eq!(
            rendered,
            "1970-01-01 00:00  Hello  <1@x>\n\
             \x20\x20`- [not found]  <2@x>\n\
             \x20\x20\x20\x20`- 1970-01-01 01:00  Re: Hello  <3@x>\n"
        );
    }
}

//! Message contract consumed by the threading engine
//!
//! The engine never parses mail itself. Anything that can report an id, an
//! optional timestamp and the raw reference tokens taken from its headers
//! can be threaded.

use std::borrow::Borrow;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A normalized Message-ID (without angle brackets).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Parse a single id token as found in `Message-ID`, `In-Reply-To` or
    /// `References`.
    ///
    /// Surrounding whitespace and one pair of angle brackets are removed.
    /// Returns `None` for tokens that cannot be a message id: empty tokens,
    /// tokens with embedded whitespace, stray angle brackets or control
    /// characters.
    pub fn parse(token: &str) -> Option<Self> {
        let trimmed = token.trim();
        let inner = trimmed
            .strip_prefix('<')
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(trimmed)
            .trim();

        if inner.is_empty() {
            return None;
        }

        let malformed = inner
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>');
        if malformed {
            return None;
        }

        Some(MessageId(inner.to_string()))
    }

    /// Id used by `ThreadManager::all` to make every source scan to its end.
    /// It can never be produced by `parse`.
    pub(crate) fn sentinel() -> Self {
        MessageId("<not-existing>".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for MessageId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for MessageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Raw reference tokens of one message.
///
/// Tokens are kept exactly as the header parser produced them; the engine
/// validates each with [`MessageId::parse`] and skips the ones that fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct References {
    /// Direct parent named by `In-Reply-To`
    pub in_reply_to: Option<String>,

    /// Ancestry named by `References`, oldest first
    pub references: Vec<String>,
}

impl References {
    pub fn is_empty(&self) -> bool {
        self.in_reply_to.is_none() && self.references.is_empty()
    }
}

/// A concrete message handle that can be threaded.
///
/// Handles are compared with `PartialEq` when an instance is removed from
/// its node, so two handles are equal iff they denote the same stored copy.
pub trait Message: Clone + PartialEq {
    fn message_id(&self) -> &MessageId;

    fn timestamp(&self) -> Option<DateTime<Utc>>;

    fn references(&self) -> References;

    /// Informational only; the engine never drops deleted messages.
    fn is_deleted(&self) -> bool {
        false
    }

    fn subject(&self) -> Option<&str> {
        None
    }

    /// Display name or address of the sender, when known
    fn author(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_strips_brackets() {
        assert_eq!(
            MessageId::parse("<test@example.com>").map(|id| id.to_string()),
            Some("test@example.com".to_string())
        );
        assert_eq!(
            MessageId::parse("  bare@example.com ").map(|id| id.to_string()),
            Some("bare@example.com".to_string())
        );
    }

    #[test]
    fn test_parse_rejects_malformed_tokens() {
        assert_eq!(MessageId::parse(""), None);
        assert_eq!(MessageId::parse("<>"), None);
        assert_eq!(MessageId::parse("< >"), None);
        assert_eq!(MessageId::parse("two words@x"), None);
        assert_eq!(MessageId::parse("<a@x><b@x>"), None);
        assert_eq!(MessageId::parse("nul\0@x"), None);
    }

    #[test]
    fn test_sentinel_is_not_parseable() {
        let sentinel = MessageId::sentinel();
        assert_ne!(MessageId::parse(sentinel.as_str()), Some(sentinel.clone()));
        assert!(sentinel.as_str().contains('<'));
    }
}

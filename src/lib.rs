pub mod config;
pub mod error;
pub mod folder;
pub mod mbox;
pub mod message;
pub mod models;
pub mod threading;

use env_logger::Env;
use std::sync::Once;

pub use config::ThreadingConfig;
pub use error::{ParseMessageError, ThreadError};
pub use folder::{LazyFolder, Source, ThreadSink, Window};
pub use message::{Message, MessageId, References};
pub use threading::{LinkOutcome, Quality, ThreadIndex, ThreadManager, ThreadNode};

static LOGGER: Once = Once::new();

/// Install the `env_logger` backend once; `RUST_LOG` overrides the default
/// `info` filter.
pub fn init_logger() {
    LOGGER.call_once(|| {
        env_logger::Builder::from_env(Env::default().default_filter_or("info"))
            .format_timestamp(None)
            .init();
    });
}

#[cfg_attr(not(test), allow(dead_code))]
pub mod test_support {
    use chrono::{DateTime, Utc};

    use crate::message::{Message, MessageId, References};

    /// Timestamp `secs` seconds after the Unix epoch.
    pub fn ts(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap_or_default()
    }

    /// Minimal message for threading tests, built up with chained setters.
    #[derive(Debug, Clone, PartialEq)]
    pub struct TestMessage {
        id: MessageId,
        timestamp: Option<DateTime<Utc>>,
        in_reply_to: Option<String>,
        references: Vec<String>,
        subject: Option<String>,
        deleted: bool,
    }

    impl TestMessage {
        /// Panics on an id that `MessageId::parse` refuses.
        pub fn new(id: &str) -> Self {
            Self {
                id: MessageId::parse(id).expect("valid test message id"),
                timestamp: None,
                in_reply_to: None,
                references: Vec::new(),
                subject: None,
                deleted: false,
            }
        }

        /// Raw In-Reply-To token, kept as given (may be malformed)
        pub fn replying_to(mut self, parent: &str) -> Self {
            self.in_reply_to = Some(parent.to_string());
            self
        }

        /// Raw References tokens, oldest first
        pub fn with_references(mut self, references: &[&str]) -> Self {
            self.references = references.iter().map(|r| r.to_string()).collect();
            self
        }

        pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
            self.timestamp = Some(timestamp);
            self
        }

        pub fn with_subject(mut self, subject: &str) -> Self {
            self.subject = Some(subject.to_string());
            self
        }

        pub fn mark_deleted(mut self) -> Self {
            self.deleted = true;
            self
        }
    }

    impl Message for TestMessage {
        fn message_id(&self) -> &MessageId {
            &self.id
        }

        fn timestamp(&self) -> Option<DateTime<Utc>> {
            self.timestamp
        }

        fn references(&self) -> References {
            References {
                in_reply_to: self.in_reply_to.clone(),
                references: self.references.clone(),
            }
        }

        fn is_deleted(&self) -> bool {
            self.deleted
        }

        fn subject(&self) -> Option<&str> {
            self.subject.as_deref()
        }
    }
}

//! Message sources
//!
//! A source is a possibly lazily loaded collection of messages, typically a
//! mail folder. The thread manager consults sources when a thread has holes
//! and hands them a [`ThreadSink`] to deliver whatever they reveal. Sources
//! never hold on to the manager.

pub mod lazy;
pub mod set;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::message::MessageId;

pub use lazy::LazyFolder;
pub use set::SourceSet;

/// How many not-yet-loaded messages a source may inspect per request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Window {
    Count(usize),
    All,
}

impl Window {
    pub fn allows(self, inspected: usize) -> bool {
        match self {
            Window::Count(limit) => inspected < limit,
            Window::All => true,
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Window::Count(limit) => write!(f, "{}", limit),
            Window::All => f.write_str("ALL"),
        }
    }
}

impl FromStr for Window {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Window::All);
        }
        trimmed
            .parse::<usize>()
            .map(Window::Count)
            .map_err(|_| format!("invalid window `{}`: expected ALL or a count", trimmed))
    }
}

/// Receiver for messages a source reveals while resolving
pub trait ThreadSink<M> {
    fn in_thread(&mut self, message: M);
}

/// A collection of messages the thread manager can draw from.
pub trait Source<M> {
    /// Unique name; the manager includes a source at most once per name.
    fn name(&self) -> &str;

    /// Messages that are already loaded. Only these are threaded when the
    /// source is included.
    fn messages(&self) -> Vec<M>;

    /// Try to reveal the messages named in `wanted`.
    ///
    /// Newly loaded messages go to `sink`. The scan stops once everything
    /// is found, once a message older than `not_before` was seen, or when
    /// `window` is used up. Returns the ids still missing.
    fn resolve(
        &mut self,
        wanted: &HashSet<MessageId>,
        not_before: Option<DateTime<Utc>>,
        window: Window,
        sink: &mut dyn ThreadSink<M>,
    ) -> HashSet<MessageId>;
}

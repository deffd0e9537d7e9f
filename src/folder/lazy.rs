//! In-memory folder with lazy loading
//!
//! Holds messages in the folder's natural order (oldest first). Only a tail
//! of them counts as loaded; the rest is revealed on demand by scanning
//! backwards from the oldest loaded message, the way a mail client reads
//! headers of an mbox it has only partially indexed. The scan position is
//! kept between requests so later requests continue where the previous one
//! stopped.

use std::collections::HashSet;

use chrono::{DateTime, Utc};

use crate::message::{Message, MessageId};

use super::{Source, ThreadSink, Window};

#[derive(Debug, Clone)]
pub struct LazyFolder<M> {
    name: String,
    messages: Vec<M>,
    first_loaded: usize,
}

impl<M: Message> LazyFolder<M> {
    /// Folder where only the newest `loaded_tail` messages are loaded
    pub fn new(name: impl Into<String>, messages: Vec<M>, loaded_tail: usize) -> Self {
        let first_loaded = messages.len().saturating_sub(loaded_tail);
        LazyFolder {
            name: name.into(),
            messages,
            first_loaded,
        }
    }

    /// Folder with every message loaded
    pub fn resolved(name: impl Into<String>, messages: Vec<M>) -> Self {
        LazyFolder {
            name: name.into(),
            messages,
            first_loaded: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn loaded_count(&self) -> usize {
        self.messages.len() - self.first_loaded
    }

    pub fn is_fully_loaded(&self) -> bool {
        self.first_loaded == 0
    }

    /// Append a newly arrived message; it is loaded immediately.
    ///
    /// Only useful before the folder is registered. Once the manager owns
    /// it, new arrivals go through `ThreadManager::to_be_threaded`.
    pub fn push(&mut self, message: M) {
        self.messages.push(message);
    }
}

impl<M: Message> Source<M> for LazyFolder<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn messages(&self) -> Vec<M> {
        self.messages[self.first_loaded..].to_vec()
    }

    fn resolve(
        &mut self,
        wanted: &HashSet<MessageId>,
        not_before: Option<DateTime<Utc>>,
        window: Window,
        sink: &mut dyn ThreadSink<M>,
    ) -> HashSet<MessageId> {
        let mut search = wanted.clone();
        if search.is_empty() || self.first_loaded == 0 {
            return search;
        }

        let mut inspected = 0;
        while self.first_loaded > 0 && window.allows(inspected) {
            self.first_loaded -= 1;
            inspected += 1;

            let message = self.messages[self.first_loaded].clone();
            let found = search.remove(message.message_id());
            let too_old = match (not_before, message.timestamp()) {
                (Some(bound), Some(stamp)) => stamp < bound,
                _ => false,
            };

            sink.in_thread(message);

            if found && search.is_empty() {
                break;
            }
            if too_old {
                break;
            }
        }

        log::debug!(
            "{}: inspected {} messages, {} of {} ids still missing",
            self.name,
            inspected,
            search.len(),
            wanted.len()
        );

        search
    }
}

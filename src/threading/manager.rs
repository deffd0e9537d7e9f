//! Thread manager
//!
//! Orchestrates ingestion, deferred edge resolution, hole filling and
//! enumeration over a set of message sources.
//!
//! ## Two-phase ingestion
//!
//! `in_thread` only records a message on its node and queues the node.
//! Edges are installed by `process_pending`, which every query runs first.
//! A batch of messages is therefore linked against one index snapshot in
//! which all instance lists are already populated: a dummy created for a
//! parent cannot race that parent's own arrival later in the same batch.
//!
//! ## Hole filling
//!
//! `thread` and `thread_start` look for dummy nodes and ask the registered
//! sources, in registration order, to reveal the missing messages. Every
//! request is bounded by a timestamp, a window or both, and the loops end as
//! soon as no source makes progress.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::config::ThreadingConfig;
use crate::error::ThreadError;
use crate::folder::{Source, SourceSet, ThreadSink, Window};
use crate::message::{Message, MessageId};

use super::index::ThreadIndex;
use super::linking::{LinkStats, link_message_references};
use super::node::{LinkOutcome, Quality, ThreadNode};
use super::pending::PendingQueue;
use super::render::render_thread;
use super::sorting::{compare_estimates, sort_threads};
use super::traversal::{collect_dummies, collect_thread_members, start_time_estimate, subtree_has_instances};

/// Incremental thread builder over a set of sources.
///
/// Not internally synchronized: a multi-threaded embedder must guard the
/// whole manager with one lock.
pub struct ThreadManager<M> {
    index: ThreadIndex<M>,
    pending: PendingQueue,
    sources: SourceSet<M>,
    /// Messages handed in through `to_be_threaded`, per source name; the
    /// source itself never lists them
    arrivals: HashMap<String, Vec<M>>,
    config: ThreadingConfig,
    cleanup_needed: bool,
}

/// Sink handed to sources; feeds revealed messages into the index and
/// the pending queue without touching the source set.
struct Ingest<'a, M> {
    index: &'a mut ThreadIndex<M>,
    pending: &'a mut PendingQueue,
}

impl<M: Message> ThreadSink<M> for Ingest<'_, M> {
    fn in_thread(&mut self, message: M) {
        ingest(self.index, self.pending, message);
    }
}

fn ingest<M: Message>(index: &mut ThreadIndex<M>, pending: &mut PendingQueue, message: M) {
    let id = message.message_id().clone();
    index.create_dummy(id.clone()).add_instance(message);
    pending.enqueue(id);
}

fn resolve_pending<M: Message>(index: &mut ThreadIndex<M>, pending: &mut PendingQueue) -> LinkStats {
    let queued = pending.drain();
    let mut stats = LinkStats::default();

    for id in &queued {
        // Nodes removed by cleanup after they were queued have nothing to link
        let Some(node) = index.get(id) else {
            continue;
        };
        let headers: Vec<_> = node.instances().iter().map(|m| m.references()).collect();

        for refs in headers.iter().filter(|refs| !refs.is_empty()) {
            stats.merge(link_message_references(index, id, refs));
        }
    }

    if !queued.is_empty() {
        log::debug!(
            "resolved {} pending nodes: {} links, {} rejected, {} dummies, {} malformed tokens",
            queued.len(),
            stats.attached,
            stats.rejected,
            stats.dummies,
            stats.malformed
        );
    }

    stats
}

impl<M: Message> Default for ThreadManager<M> {
    fn default() -> Self {
        Self::with_config(ThreadingConfig::default())
    }
}

impl<M: Message> ThreadManager<M> {
    /// Create a manager; fails when `config` does not validate.
    pub fn new(config: ThreadingConfig) -> Result<Self, ThreadError> {
        config.validate()?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: ThreadingConfig) -> Self {
        ThreadManager {
            index: ThreadIndex::new(),
            pending: PendingQueue::new(),
            sources: SourceSet::new(),
            arrivals: HashMap::new(),
            config,
            cleanup_needed: false,
        }
    }

    pub fn config(&self) -> &ThreadingConfig {
        &self.config
    }

    /// The graph as it stands, including links not yet resolved from
    /// pending nodes.
    pub fn index(&self) -> &ThreadIndex<M> {
        &self.index
    }

    pub fn node(&self, id: &MessageId) -> Option<&ThreadNode<M>> {
        self.index.get(id)
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.names()
    }

    /// Whether ingested messages still wait for `process_pending`
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // ===== Sources =====

    /// Register `source` and thread its loaded messages.
    ///
    /// Returns `Ok(false)` without touching anything when a source with the
    /// same name is already registered.
    pub fn include_source(&mut self, source: Box<dyn Source<M>>) -> Result<bool, ThreadError> {
        if source.name().is_empty() {
            return Err(ThreadError::UnnamedSource);
        }

        let name = source.name().to_string();
        let messages = source.messages();

        if self.sources.insert(source).is_err() {
            log::debug!("source {} already included", name);
            return Ok(false);
        }

        let count = messages.len();
        for message in messages {
            self.in_thread(message);
        }

        log::debug!("included source {} with {} loaded messages", name, count);
        Ok(true)
    }

    /// Deregister a source and withdraw its loaded messages from their
    /// nodes. Threads left without any message are dropped by the next
    /// cleanup. Unknown names are ignored.
    pub fn remove_source(&mut self, name: &str) -> Option<Box<dyn Source<M>>> {
        let source = self.sources.remove(name)?;

        let mut messages = source.messages();
        messages.extend(self.arrivals.remove(name).unwrap_or_default());
        for message in &messages {
            self.out_thread(message);
        }
        self.cleanup_needed = true;

        log::debug!("removed source {} ({} messages withdrawn)", name, messages.len());
        Some(source)
    }

    /// Thread messages that newly appeared in a registered source.
    ///
    /// The messages are remembered under the source's name, so
    /// `remove_source` withdraws them along with the source's own listing.
    /// Returns how many were taken; 0 when the source is not registered.
    pub fn to_be_threaded(&mut self, source_name: &str, messages: impl IntoIterator<Item = M>) -> usize {
        if !self.sources.contains(source_name) {
            log::debug!("ignoring messages for unregistered source {}", source_name);
            return 0;
        }

        let mut count = 0;
        for message in messages {
            self.arrivals
                .entry(source_name.to_string())
                .or_default()
                .push(message.clone());
            self.in_thread(message);
            count += 1;
        }
        count
    }

    /// Withdraw messages that disappeared from a registered source.
    pub fn to_be_unthreaded(&mut self, source_name: &str, messages: &[M]) -> usize {
        if !self.sources.contains(source_name) {
            log::debug!("ignoring removals for unregistered source {}", source_name);
            return 0;
        }

        if let Some(arrived) = self.arrivals.get_mut(source_name) {
            arrived.retain(|m| !messages.contains(m));
        }

        messages.iter().filter(|m| self.out_thread(m)).count()
    }

    // ===== Ingestion =====

    /// Record `message` on its node and queue the node for linking.
    pub fn in_thread(&mut self, message: M) {
        ingest(&mut self.index, &mut self.pending, message);
    }

    /// Remove `message` from its node. The node itself and its links stay;
    /// returns whether anything was removed.
    pub fn out_thread(&mut self, message: &M) -> bool {
        let Some(node) = self.index.get_mut(message.message_id()) else {
            return false;
        };

        let removed = node.remove_instance(message) > 0;
        if removed && node.is_dummy() {
            self.cleanup_needed = true;
        }
        removed
    }

    /// Turn the reference headers of every pending node into links.
    pub fn process_pending(&mut self) -> LinkStats {
        resolve_pending(&mut self.index, &mut self.pending)
    }

    /// Create an instance-free node for `id` (or return the existing node).
    pub fn create_dummy(&mut self, id: MessageId) -> &ThreadNode<M> {
        self.index.create_dummy(id)
    }

    /// Assert a parent link directly, e.g. from a caller's own heuristics
    /// (usually with `Quality::Guess`).
    pub fn follows(&mut self, child: &MessageId, parent: &MessageId, quality: Quality) -> LinkOutcome {
        self.index.link(child, parent, quality)
    }

    // ===== Queries =====

    /// The node of `message` with as many holes below it filled as the
    /// sources can provide.
    ///
    /// Sources are searched without a count limit, back to the message's
    /// timestamp minus the configured margin. Returns `None` for a message
    /// that was never threaded.
    pub fn thread(&mut self, message: &M) -> Option<&ThreadNode<M>> {
        self.process_pending();

        let id = message.message_id().clone();
        if !self.index.contains(&id) {
            return None;
        }

        // A bound before the representable range means no bound
        let not_before = message
            .timestamp()
            .and_then(|stamp| stamp.checked_sub_signed(self.config.margin));
        self.fill_holes(&id, not_before);

        self.index.get(&id)
    }

    fn fill_holes(&mut self, root: &MessageId, not_before: Option<DateTime<Utc>>) {
        let mut missing: HashSet<MessageId> = collect_dummies(&self.index, root).into_iter().collect();
        if missing.is_empty() {
            return;
        }

        log::debug!("thread {} has {} holes", root, missing.len());

        while !missing.is_empty() {
            let pass_start = missing.clone();

            for source in self.sources.iter_mut() {
                let mut sink = Ingest {
                    index: &mut self.index,
                    pending: &mut self.pending,
                };
                let now_missing = source.resolve(&missing, not_before, Window::All, &mut sink);

                if now_missing.len() < missing.len() {
                    log::debug!(
                        "source {} resolved {} of {} holes",
                        source.name(),
                        missing.len() - now_missing.len(),
                        missing.len()
                    );
                    resolve_pending(&mut self.index, &mut self.pending);
                    missing = now_missing;
                    if missing.is_empty() {
                        break;
                    }
                }
            }

            // Revealed messages may open new holes further down; go again
            // only while the shape of the thread keeps changing.
            let refreshed: HashSet<MessageId> = collect_dummies(&self.index, root).into_iter().collect();
            if refreshed == pass_start {
                break;
            }
            missing = refreshed;
        }

        // Messages revealed by a source that made no progress
        resolve_pending(&mut self.index, &mut self.pending);
    }

    /// The root of the thread `message` belongs to.
    ///
    /// Runs [`thread`](Self::thread) first, then climbs the parent chain.
    /// Every dummy ancestor is searched for in each source, limited by the
    /// configured window and by the configured timespan before the node
    /// currently reached (unbounded when that node is a dummy itself).
    pub fn thread_start(&mut self, message: &M) -> Option<&ThreadNode<M>> {
        if self.thread(message).is_none() {
            return None;
        }

        let mut current = message.message_id().clone();
        let mut visited = HashSet::new();

        while visited.insert(current.clone()) {
            let Some(parent_id) = self.index.get(&current).and_then(|n| n.parent_id().cloned()) else {
                break;
            };

            let parent_is_dummy = self.index.get(&parent_id).is_some_and(|n| n.is_dummy());
            if parent_is_dummy {
                let current_stamp = self
                    .index
                    .get(&current)
                    .filter(|n| !n.is_dummy())
                    .and_then(|n| n.timestamp());
                let not_before = match (self.config.timespan, current_stamp) {
                    (Some(span), Some(stamp)) => stamp.checked_sub_signed(span),
                    _ => None,
                };
                self.resolve_ancestor(&parent_id, not_before);
            }

            current = parent_id;
        }

        self.index.get(&current)
    }

    fn resolve_ancestor(&mut self, wanted_id: &MessageId, not_before: Option<DateTime<Utc>>) {
        let wanted: HashSet<MessageId> = HashSet::from([wanted_id.clone()]);
        let window = self.config.window;

        for source in self.sources.iter_mut() {
            let mut sink = Ingest {
                index: &mut self.index,
                pending: &mut self.pending,
            };
            if source.resolve(&wanted, not_before, window, &mut sink).is_empty() {
                log::debug!("source {} found ancestor {}", source.name(), wanted_id);
                break;
            }
        }

        resolve_pending(&mut self.index, &mut self.pending);
    }

    // ===== Enumeration =====

    /// Remove threads that no longer contain a single message. Only runs
    /// after a removal made it necessary; returns the nodes deleted.
    pub fn cleanup(&mut self) -> usize {
        if !self.cleanup_needed {
            return 0;
        }

        let roots: Vec<MessageId> = self.index.roots().iter().map(|n| n.id().clone()).collect();
        let mut removed = 0;
        for root in &roots {
            if !subtree_has_instances(&self.index, root) {
                removed += self.index.remove_subtree(root);
            }
        }

        self.cleanup_needed = false;
        log::debug!("cleanup removed {} nodes", removed);
        removed
    }

    fn settle(&mut self) {
        self.process_pending();
        self.cleanup();
    }

    /// Roots of every thread known so far, in discovery order. May include
    /// dummy roots.
    pub fn known(&mut self) -> Vec<&ThreadNode<M>> {
        self.settle();
        self.index.roots()
    }

    /// Like [`known`](Self::known), after making every source load all
    /// of its messages.
    pub fn all(&mut self) -> Vec<&ThreadNode<M>> {
        self.load_everything();
        self.known()
    }

    fn load_everything(&mut self) {
        let sentinel = HashSet::from([MessageId::sentinel()]);
        for source in self.sources.iter_mut() {
            let mut sink = Ingest {
                index: &mut self.index,
                pending: &mut self.pending,
            };
            source.resolve(&sentinel, None, Window::All, &mut sink);
        }
    }

    /// `known()` ordered by start-time estimate; threads without any
    /// timestamp come last.
    pub fn sorted_known(&mut self) -> Vec<&ThreadNode<M>> {
        self.sorted_known_by(|index, node| start_time_estimate(index, node.id()), compare_estimates)
    }

    /// `known()` ordered by a caller-supplied key and comparison. Threads
    /// with equal keys keep their discovery order.
    pub fn sorted_known_by<K, E, C>(&mut self, estimate: E, compare: C) -> Vec<&ThreadNode<M>>
    where
        E: Fn(&ThreadIndex<M>, &ThreadNode<M>) -> K,
        C: Fn(&K, &K) -> Ordering,
    {
        self.settle();
        let index = &self.index;
        sort_threads(index, index.roots(), estimate, compare)
    }

    pub fn sorted_all(&mut self) -> Vec<&ThreadNode<M>> {
        self.load_everything();
        self.sorted_known()
    }

    pub fn sorted_all_by<K, E, C>(&mut self, estimate: E, compare: C) -> Vec<&ThreadNode<M>>
    where
        E: Fn(&ThreadIndex<M>, &ThreadNode<M>) -> K,
        C: Fn(&K, &K) -> Ordering,
    {
        self.load_everything();
        self.sorted_known_by(estimate, compare)
    }

    /// Real messages below `root` with their depth (see
    /// `traversal::collect_thread_members`)
    pub fn thread_messages(&self, root: &MessageId) -> Vec<(MessageId, i32)> {
        let starting_depth = match self.index.get(root) {
            Some(node) if node.is_dummy() => -1,
            _ => 0,
        };
        collect_thread_members(&self.index, root, starting_depth)
    }

    pub fn render_thread(&self, root: &MessageId) -> String {
        render_thread(&self.index, root)
    }
}

impl<M: Message> ThreadSink<M> for ThreadManager<M> {
    fn in_thread(&mut self, message: M) {
        ThreadManager::in_thread(self, message);
    }
}

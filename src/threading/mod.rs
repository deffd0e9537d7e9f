//! Incremental email threading
//!
//! Builds reply trees from messages that arrive in any order, from several
//! folders, with reference headers that cannot be trusted.
//!
//! ## Threading Strategy
//!
//! Only explicit header references are used, never subject matching:
//!
//! 1. **In-Reply-To**: names the direct parent; gives a `Reply` link
//! 2. **References**: the ancestry chain, oldest first; each consecutive
//!    pair gives a `Reference` link
//!
//! Referenced messages that are not available yet get dummy nodes, which
//! later turn into real nodes when the message shows up. Links only ever get
//! stronger and a link that would close a cycle is refused.
//!
//! ## Module Structure
//!
//! - `node`: thread nodes and link quality
//! - `index`: the Message-ID to node arena and the linking rules
//! - `pending`: nodes waiting for their headers to be linked
//! - `linking`: turning reference headers into links
//! - `traversal`: subtree walks and time estimates
//! - `sorting`: ordering threads and follow-ups
//! - `render`: text rendering of a thread
//! - `manager`: ingestion, hole filling and source lifecycle

pub mod index;
pub mod linking;
pub mod manager;
pub mod node;
pub mod pending;
pub mod render;
pub mod sorting;
pub mod traversal;

// Re-export main types
pub use index::ThreadIndex;
pub use linking::LinkStats;
pub use manager::ThreadManager;
pub use node::{LinkOutcome, Quality, ThreadNode};
pub use pending::PendingQueue;

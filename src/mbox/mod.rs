//! mbox adapter
//!
//! Reads an mbox file into a [`LazyFolder`] of [`MailMessage`]s so that
//! real mailboxes can be threaded. Messages are split on `From ` envelope
//! lines; only their headers are parsed.

pub mod parser;

use std::path::Path;

use crate::error::ThreadError;
use crate::folder::LazyFolder;

pub use parser::{MailMessage, parse_message};

/// Split raw mbox data into messages, envelope lines removed.
///
/// Data before the first envelope line is ignored. Input without any
/// envelope line is treated as a single message.
pub fn split_mbox(data: &[u8]) -> Vec<&[u8]> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in data.split_inclusive(|&b| b == b'\n') {
        if line.starts_with(b"From ") {
            starts.push(offset);
        }
        offset += line.len();
    }

    if starts.is_empty() {
        return if is_blank(data) { Vec::new() } else { vec![data] };
    }

    let mut messages = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(data.len());
        let chunk = &data[start..end];
        let body_start = chunk
            .iter()
            .position(|&b| b == b'\n')
            .map_or(chunk.len(), |p| p + 1);
        let message = &chunk[body_start..];
        if !is_blank(message) {
            messages.push(message);
        }
    }
    messages
}

fn is_blank(data: &[u8]) -> bool {
    data.iter().all(u8::is_ascii_whitespace)
}

/// Parse every message of an mbox buffer.
///
/// Messages that fail to parse are logged and skipped; the second value is
/// how many were skipped.
pub fn load_messages(data: &[u8], folder: &str) -> (Vec<MailMessage>, usize) {
    let mut messages = Vec::new();
    let mut skipped = 0;

    for (position, raw) in split_mbox(data).into_iter().enumerate() {
        match parse_message(raw, folder, position) {
            Ok(message) => messages.push(message),
            Err(e) => {
                log::warn!("{}: skipping message #{}: {}", folder, position, e);
                skipped += 1;
            }
        }
    }

    (messages, skipped)
}

/// Open an mbox file as a lazily loaded folder named after its path.
///
/// With `loaded_tail` set, only that many of the newest messages count as
/// loaded; the rest are revealed when threading asks for them.
pub fn open_mbox(path: &Path, loaded_tail: Option<usize>) -> Result<LazyFolder<MailMessage>, ThreadError> {
    let data = std::fs::read(path).map_err(|source| ThreadError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let name = path.display().to_string();
    let (messages, skipped) = load_messages(&data, &name);

    log::info!(
        "{}: read {} messages ({} skipped)",
        name,
        messages.len(),
        skipped
    );

    Ok(match loaded_tail {
        Some(tail) => LazyFolder::new(name, messages, tail),
        None => LazyFolder::resolved(name, messages),
    })
}

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the threading engine and its mailbox adapter.
///
/// Bad reference data in messages is never an error; it is skipped while
/// linking. Only misuse and I/O end up here.
#[derive(Debug, Error)]
pub enum ThreadError {
    #[error("invalid threading configuration: {0}")]
    InvalidConfig(String),
    #[error("source has no name and cannot be registered")]
    UnnamedSource,
    #[error("failed to read mailbox {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Errors for a single message that could not be turned into a thread member.
#[derive(Debug, Error)]
pub enum ParseMessageError {
    #[error("failed to parse MIME structure: {0}")]
    MimeParse(#[from] mailparse::MailParseError),
    #[error("missing Message-ID header")]
    MissingMessageId,
    #[error("malformed Message-ID `{raw}`")]
    InvalidMessageId { raw: String },
}

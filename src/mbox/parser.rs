//! Header parsing for threading.
//!
//! Only the headers that matter for threading and display are read; bodies
//! are never decoded. The `mailparse` crate does the RFC 5322 header work.
//!
//! # Reference Parsing
//!
//! `In-Reply-To` and `References` are reduced to their `<...>` tokens.
//! Tokens are kept raw: validating them is the threading engine's job, which
//! skips the malformed ones. Headers without any angle brackets fall back to
//! whitespace splitting, which some broken clients require.
//!
//! # Error Handling
//!
//! A message fails to parse when its header block is not valid or when it
//! has no usable Message-ID. A missing or unparsable Date is not an error:
//! the message is threaded without a timestamp.

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use mailparse::{MailHeaderMap, parse_headers};
use regex::Regex;

use crate::error::ParseMessageError;
use crate::message::{Message, MessageId, References};

/// Lazy-initialized regex for `<message-id>` tokens
static ID_TOKEN_REGEX: OnceLock<Regex> = OnceLock::new();

fn id_token_regex() -> &'static Regex {
    ID_TOKEN_REGEX.get_or_init(|| Regex::new(r"<[^<>]*>").expect("Invalid message-id token regex"))
}

/// One message read from a mailbox.
///
/// `folder` and `position` identify the stored copy, so the same message
/// found in two mailboxes yields two distinct instances.
#[derive(Debug, Clone, PartialEq)]
pub struct MailMessage {
    pub message_id: MessageId,
    pub subject: String,
    pub date: Option<DateTime<Utc>>,
    pub author: String,
    pub in_reply_to: Option<String>,
    pub references: Vec<String>,
    pub deleted: bool,
    pub folder: String,
    pub position: usize,
}

impl Message for MailMessage {
    fn message_id(&self) -> &MessageId {
        &self.message_id
    }

    fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.date
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
        Some(&self.subject)
    }

    fn author(&self) -> Option<&str> {
        Some(self.author.as_str()).filter(|author| !author.is_empty())
    }
}

/// Sanitize text by removing NUL bytes and surrounding whitespace
fn sanitize_text(text: &str) -> String {
    text.replace('\0', "").trim().to_string()
}

/// Every `<...>` token in a header value, brackets included
fn extract_id_tokens(header_value: &str) -> Vec<String> {
    let tokens: Vec<String> = id_token_regex()
        .find_iter(header_value)
        .map(|m| m.as_str().to_string())
        .collect();

    if !tokens.is_empty() {
        return tokens;
    }

    header_value
        .split_whitespace()
        .map(|token| token.to_string())
        .collect()
}

fn parse_date(raw: Option<String>, message_id: &MessageId) -> Option<DateTime<Utc>> {
    let raw = raw?;
    if raw.trim().is_empty() {
        return None;
    }

    match dateparser::parse(&raw) {
        Ok(dt) => Some(dt.with_timezone(&Utc)),
        Err(error) => {
            log::debug!("{}: unparsable Date `{}`: {}", message_id, raw, error);
            None
        }
    }
}

fn parse_author(raw: Option<String>) -> String {
    let from = raw.unwrap_or_default();
    match mailparse::addrparse(&from) {
        Ok(addrs) => match addrs.iter().next() {
            Some(mailparse::MailAddr::Single(info)) => match &info.display_name {
                Some(name) if !name.trim().is_empty() => sanitize_text(name),
                _ => info.addr.to_lowercase(),
            },
            _ => sanitize_text(&from),
        },
        Err(_) => sanitize_text(&from),
    }
}

/// Parse the header block of one raw message.
///
/// `folder` and `position` are recorded on the result to tell stored copies
/// apart.
pub fn parse_message(
    raw: &[u8],
    folder: &str,
    position: usize,
) -> Result<MailMessage, ParseMessageError> {
    let (headers, _) = parse_headers(raw)?;

    let raw_id = headers
        .get_first_value("Message-ID")
        .ok_or(ParseMessageError::MissingMessageId)?;
    let message_id = MessageId::parse(&raw_id)
        .ok_or_else(|| ParseMessageError::InvalidMessageId { raw: raw_id.clone() })?;

    let subject = headers
        .get_first_value("Subject")
        .map(|s| sanitize_text(&s))
        .unwrap_or_else(|| "(No Subject)".to_string());

    let date = parse_date(headers.get_first_value("Date"), &message_id);
    let author = parse_author(headers.get_first_value("From"));

    // In-Reply-To may carry comments; the first id token is the parent
    let in_reply_to = headers
        .get_first_value("In-Reply-To")
        .and_then(|v| extract_id_tokens(&v).into_iter().next());

    let references = headers
        .get_first_value("References")
        .map(|v| extract_id_tokens(&v))
        .unwrap_or_default();

    let deleted = ["Status", "X-Status"].iter().any(|name| {
        headers
            .get_first_value(name)
            .is_some_and(|flags| flags.contains('D'))
    });

    log::trace!("parsed: {} - {}", message_id, subject);

    Ok(MailMessage {
        message_id,
        subject,
        date,
        author,
        in_reply_to,
        references,
        deleted,
        folder: folder.to_string(),
        position,
    })
}

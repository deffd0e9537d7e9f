use std::env;

use chrono::Duration;

use crate::error::ThreadError;
use crate::folder::Window;

const DEFAULT_WINDOW: usize = 10;
const DEFAULT_TIMESPAN_SECS: i64 = 3 * 24 * 60 * 60;
const DEFAULT_MARGIN_SECS: i64 = 60 * 60;

fn lookup_window(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: Window) -> Window {
    lookup(key)
        .and_then(|value| value.parse::<Window>().ok())
        .unwrap_or(default)
}

fn lookup_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: i64) -> Duration {
    lookup(key)
        .and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| Duration::seconds(default))
}

/// `EVER` (any case) disables the bound
fn lookup_timespan(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    default: i64,
) -> Option<Duration> {
    match lookup(key) {
        Some(value) if value.trim().eq_ignore_ascii_case("ever") => None,
        _ => Some(lookup_secs(lookup, key, default)),
    }
}

/// Search bounds used while filling holes in threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadingConfig {
    /// Messages each source may inspect per ancestor in `thread_start`
    pub window: Window,
    /// How far before the current message `thread_start` searches;
    /// `None` searches the whole source
    pub timespan: Option<Duration>,
    /// Clock-skew allowance subtracted from a message's timestamp in `thread`
    pub margin: Duration,
}

impl ThreadingConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unparsable values fall back to
    /// the defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            window: lookup_window(&lookup, "THREADER_WINDOW", Window::Count(DEFAULT_WINDOW)),
            timespan: lookup_timespan(&lookup, "THREADER_TIMESPAN_SECS", DEFAULT_TIMESPAN_SECS),
            margin: lookup_secs(&lookup, "THREADER_MARGIN_SECS", DEFAULT_MARGIN_SECS),
        }
    }

    pub fn validate(&self) -> Result<(), ThreadError> {
        if self.window == Window::Count(0) {
            return Err(ThreadError::InvalidConfig(
                "window must be ALL or at least 1".into(),
            ));
        }
        if self.margin < Duration::zero() {
            return Err(ThreadError::InvalidConfig("margin must not be negative".into()));
        }
        if self.timespan.is_some_and(|span| span < Duration::zero()) {
            return Err(ThreadError::InvalidConfig(
                "timespan must not be negative".into(),
            ));
        }
        Ok(())
    }
}

impl Default for ThreadingConfig {
    fn default() -> Self {
        Self {
            window: Window::Count(DEFAULT_WINDOW),
            timespan: Some(Duration::seconds(DEFAULT_TIMESPAN_SECS)),
            margin: Duration::seconds(DEFAULT_MARGIN_SECS),
        }
    }
}

// src/feedback.rs
//! User-facing feedback: notice severity/auto-dismiss policy and
//! relative-time labels.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Default auto-dismiss delay in milliseconds for transient notices.
pub const DEFAULT_DISMISS_MS: u64 = 5000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Success,
    Info,
}

impl Severity {
    /// Presentation class for the client.
    pub fn css_class(&self) -> &'static str {
        match self {
            Severity::Error => "alert-error",
            Severity::Warning => "alert-warning",
            Severity::Success => "alert-success",
            Severity::Info => "alert-info",
        }
    }

    /// Errors and warnings persist until dismissed; success and info
    /// notices go away on their own.
    pub fn auto_dismiss(&self) -> bool {
        matches!(self, Severity::Success | Severity::Info)
    }
}

/// Dismissal behavior for one notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dismiss {
    /// Severity decides, using the default delay.
    #[default]
    Policy,
    /// Keep the notice until the user closes it.
    Never,
    /// Explicit delay in milliseconds.
    AfterMs(u64),
}

/// A transient notification handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    pub severity: Severity,
    pub dismiss: Dismiss,
}

impl Notice {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Self {
            message: message.into(),
            severity,
            dismiss: Dismiss::Policy,
        }
    }

    pub fn with_dismiss(mut self, dismiss: Dismiss) -> Self {
        self.dismiss = dismiss;
        self
    }

    /// Milliseconds after which the notice self-dismisses, or `None` if
    /// it persists.
    pub fn dismiss_after(&self) -> Option<u64> {
        match self.dismiss {
            Dismiss::Never => None,
            Dismiss::AfterMs(ms) => Some(ms),
            Dismiss::Policy => self
                .severity
                .auto_dismiss()
                .then_some(DEFAULT_DISMISS_MS),
        }
    }
}

/// Human-relative label for a past timestamp, boundary-exact:
/// under 60 s "just now", under an hour minutes, under a day hours,
/// under 30 days days, otherwise an absolute `YYYY-MM-DD` date.
pub fn relative_time(earlier: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - earlier).num_seconds().max(0);
    if seconds < 60 {
        "just now".to_string()
    } else if seconds < 3600 {
        let minutes = seconds / 60;
        format!("{} minute{} ago", minutes, plural(minutes))
    } else if seconds < 86_400 {
        let hours = seconds / 3600;
        format!("{} hour{} ago", hours, plural(hours))
    } else if seconds < 2_592_000 {
        let days = seconds / 86_400;
        format!("{} day{} ago", days, plural(days))
    } else {
        earlier.format("%Y-%m-%d").to_string()
    }
}

fn plural(n: i64) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

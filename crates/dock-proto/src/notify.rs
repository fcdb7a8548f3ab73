//! Notification seam between the client core and whatever surface shows
//! transient messages to the user.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Danger,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

/// Receives user-facing notifications. `duration = None` means the
/// surface's default display time.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity, duration: Option<Duration>);
}

/// Notifier that only writes to the log. Used when no UI is attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, message: &str, severity: Severity, _duration: Option<Duration>) {
        match severity {
            Severity::Danger | Severity::Warning => tracing::warn!("[{}] {}", severity.label(), message),
            _ => tracing::info!("[{}] {}", severity.label(), message),
        }
    }
}

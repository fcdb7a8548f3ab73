//! Bridges the client core's [`Notifier`] seam into the app event loop.

use std::time::Duration;

use dock_proto::{ApiError, Notifier, Severity};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::warn;

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
    pub duration: Option<Duration>,
}

/// Sends notifications to the UI thread without blocking the caller.
#[derive(Clone)]
pub struct ChannelNotifier {
    tx: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    pub fn new(tx: mpsc::Sender<Notification>) -> Self {
        Self { tx }
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, message: &str, severity: Severity, duration: Option<Duration>) {
        let note = Notification {
            message: message.to_string(),
            severity,
            duration,
        };
        match self.tx.try_send(note) {
            Ok(()) => {}
            // Outcome toasts must arrive; park them on a task until the loop drains.
            Err(TrySendError::Full(note)) if note.severity != Severity::Info => {
                match tokio::runtime::Handle::try_current() {
                    Ok(handle) => {
                        let tx = self.tx.clone();
                        handle.spawn(async move {
                            let _ = tx.send(note).await;
                        });
                    }
                    Err(_) => warn!("notification dropped: {}", note.message),
                }
            }
            Err(e) => warn!("notification dropped: {}", e),
        }
    }
}

/// Soft failure for a user-initiated call: one danger toast, unless the client
/// core already announced it (offline, timeout).
pub fn report_failure(notifier: &dyn Notifier, context: &str, err: &ApiError) {
    warn!("{}: {}", context, err);
    if err.already_notified() {
        return;
    }
    let severity = match err {
        ApiError::InvalidRequest(_) => Severity::Warning,
        _ => Severity::Danger,
    };
    notifier.notify(&format!("{}: {}", context, err.user_message()), severity, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_notifier_forwards_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        let notifier = ChannelNotifier::new(tx);
        notifier.notify("first", Severity::Info, None);
        notifier.notify("second", Severity::Success, Some(Duration::from_secs(1)));

        assert_eq!(rx.try_recv().unwrap().message, "first");
        let second = rx.try_recv().unwrap();
        assert_eq!(second.severity, Severity::Success);
        assert_eq!(second.duration, Some(Duration::from_secs(1)));
    }

    #[test]
    fn full_channel_drops_info_instead_of_blocking() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ChannelNotifier::new(tx);
        notifier.notify("kept", Severity::Info, None);
        notifier.notify("dropped", Severity::Info, None);
        assert_eq!(rx.try_recv().unwrap().message, "kept");
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn full_channel_still_delivers_outcomes() {
        let (tx, mut rx) = mpsc::channel(1);
        let notifier = ChannelNotifier::new(tx);
        notifier.notify("filler", Severity::Info, None);
        notifier.notify("Download complete: ubuntu.iso", Severity::Success, None);

        assert_eq!(rx.recv().await.unwrap().message, "filler");
        let late = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(late.message, "Download complete: ubuntu.iso");
        assert_eq!(late.severity, Severity::Success);
    }

    #[test]
    fn failures_already_announced_are_not_repeated() {
        let (tx, mut rx) = mpsc::channel(8);
        let notifier = ChannelNotifier::new(tx);

        report_failure(&notifier, "Pause failed", &ApiError::Offline);
        report_failure(&notifier, "Pause failed", &ApiError::Timeout(Duration::from_secs(30)));
        assert!(rx.try_recv().is_err());

        report_failure(
            &notifier,
            "Pause failed",
            &ApiError::Http {
                status: 404,
                body: r#"{"detail":"Torrent not found"}"#.into(),
            },
        );
        let note = rx.try_recv().unwrap();
        assert_eq!(note.message, "Pause failed: Torrent not found");
        assert_eq!(note.severity, Severity::Danger);
    }
}

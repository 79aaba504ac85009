//! Transient user notifications (toasts).

use std::cell::RefCell;
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

impl Severity {
    /// How long a notification of this severity stays visible.
    pub fn default_timeout(self) -> Duration {
        match self {
            Severity::Info => Duration::from_millis(2000),
            Severity::Error => Duration::from_millis(5000),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
    pub timeout: Duration,
}

impl Notification {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        Self {
            severity,
            text: text.into(),
            timeout: severity.default_timeout(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Severity::Info, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Severity::Error, text)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Sink for user-visible notifications.
pub trait Notifier {
    fn notify(&self, notification: Notification);
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Writes notifications to the log. Used by headless hosts.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: Notification) {
        match notification.severity {
            Severity::Info => tracing::info!(
                target: "weft::notify",
                timeout_ms = notification.timeout.as_millis() as u64,
                "{}",
                notification.text
            ),
            Severity::Error => tracing::error!(
                target: "weft::notify",
                timeout_ms = notification.timeout.as_millis() as u64,
                "{}",
                notification.text
            ),
        }
    }
}

/// Keeps every notification it receives.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    seen: RefCell<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.borrow().clone()
    }

    pub fn errors(&self) -> Vec<Notification> {
        self.seen
            .borrow()
            .iter()
            .filter(|n| n.severity == Severity::Error)
            .cloned()
            .collect()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.seen.borrow_mut())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.seen.borrow_mut().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_timeouts() {
        assert_eq!(Notification::info("saved").timeout, Duration::from_secs(2));
        assert_eq!(Notification::error("failed").timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notification::info("a"));
        notifier.notify(Notification::error("b"));
        assert_eq!(notifier.errors().len(), 1);
        assert_eq!(notifier.take().len(), 2);
        assert!(notifier.all().is_empty());
    }
}

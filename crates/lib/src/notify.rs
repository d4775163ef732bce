//! Transient user notices (success/error toasts) emitted by the view controllers.
//!
//! Controllers hold a `Notifier`; the front-end drains the paired receiver and renders each notice once.

use tokio::sync::mpsc;

/// Fallback text when a failure carries no usable message.
pub const GENERIC_FAILURE: &str = "Something went wrong";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

/// Sending half of the notice stream. Cloneable; sends never block and are dropped when nobody listens.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<Notice>,
}

impl Notifier {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(NoticeLevel::Success, message.into());
    }

    /// Error notice; an empty message falls back to the generic text.
    pub fn error(&self, message: impl Into<String>) {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            message
        };
        self.push(NoticeLevel::Error, message);
    }

    fn push(&self, level: NoticeLevel, message: String) {
        if self.tx.send(Notice { level, message }).is_err() {
            log::debug!("notice dropped, no listener");
        }
    }
}

//! User-facing notifications
//!
//! Controllers push an [`Alert`] whenever the user has to be told something
//! right away; the presentation layer drains the receiving end.

use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertLevel {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub level: AlertLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Alerts {
    tx: Option<mpsc::UnboundedSender<Alert>>,
}

impl Alerts {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Alert>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Alerts that go nowhere (headless use)
    pub fn silent() -> Self {
        Self { tx: None }
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(AlertLevel::Error, message.into());
    }

    fn send(&self, level: AlertLevel, message: String) {
        let Some(tx) = &self.tx else {
            return;
        };
        if tx.send(Alert { level, message }).is_err() {
            tracing::debug!("alert receiver dropped");
        }
    }
}

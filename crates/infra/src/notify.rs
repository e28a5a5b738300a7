//! Invitation notification capability.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;

use fieldgate_auth::InvitationLinks;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification to {address} failed: {reason}")]
pub struct NotifyError {
    pub address: String,
    pub reason: String,
}

/// Delivers invitation links. Failure never undoes the state change it follows.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, address: &str, links: &InvitationLinks) -> Result<(), NotifyError>;
}

/// Writes the links to the log instead of sending mail.
#[derive(Debug, Default, Clone)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify(&self, address: &str, links: &InvitationLinks) -> Result<(), NotifyError> {
        tracing::info!(
            to = %address,
            accept = %links.accept,
            decline = %links.decline,
            "invitation issued"
        );
        Ok(())
    }
}

/// Keeps every notification in memory for tests/dev; can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(String, InvitationLinks)>>,
    failing: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            failing: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, InvitationLinks)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, address: &str, links: &InvitationLinks) -> Result<(), NotifyError> {
        if self.failing {
            return Err(NotifyError {
                address: address.to_string(),
                reason: "mail relay refused the message".to_string(),
            });
        }
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((address.to_string(), links.clone()));
        }
        Ok(())
    }
}

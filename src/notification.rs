//! Outbound chat messages.
//!
//! Delivery is best-effort: by the time anything is sent the leaderboard is
//! already written, so a failed post is logged and dropped.

use std::io::Write;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;

use crate::error::NotifyError;

/// Something that can post a plain-text message to the team.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Writes each message to stdout, separated by a blank line.
#[derive(Debug, Default)]
pub struct StdoutNotifier;

#[async_trait]
impl Notifier for StdoutNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}\n", text)?;
        out.flush()?;
        Ok(())
    }
}

/// Posts `{"text": ...}` to a chat incoming-webhook URL.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        Ok(())
    }
}

/// Keeps every message in memory. Handy for tests and dry runs.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A notifier whose every send fails.
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        if self.fail {
            return Err(NotifyError::Rejected(503));
        }
        self.sent.lock().push(text.to_string());
        Ok(())
    }
}

/// Send and swallow any failure. Returns whether the message went out.
pub async fn send_or_log(notifier: &dyn Notifier, text: &str) -> bool {
    match notifier.send(text).await {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Failed to deliver chat message: {}", e);
            false
        }
    }
}

//! Chat notifications.
//!
//! A [`WebhookSink`] delivers one JSON payload per call. Delivery is
//! fire-and-forget from the caller's point of view: only the HTTP status is
//! inspected, the response body is ignored, and a failure is reported to the
//! caller without affecting any other action.
//!
//! - [`webhook`] holds the HTTP sink and a logging sink for dry runs
//! - [`slack`] renders the messages and maps GitHub logins to Slack users

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod slack;
pub mod webhook;

pub use slack::SlackUserMap;
pub use webhook::{LoggingSink, SlackWebhook};

/// A structured chat message: free-form text plus optional presentation
/// fields understood by Slack incoming webhooks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Plain-text body, also used as the notification fallback.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    /// Display name override for the posting bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Avatar override for the posting bot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,

    /// Block Kit blocks.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocks: Vec<serde_json::Value>,
}

impl WebhookPayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Posts the message under another user's name and avatar.
    pub fn posted_as(mut self, username: impl Into<String>, icon_url: Option<String>) -> Self {
        self.username = Some(username.into());
        self.icon_url = icon_url;
        self
    }
}

/// Webhook delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WebhookError {
    /// The endpoint answered with a non-2xx status.
    #[error("webhook returned HTTP {0}")]
    Status(u16),

    /// The request never completed (connection failure, timeout).
    #[error("webhook request failed: {0}")]
    Transport(String),

    /// No webhook URL was configured.
    #[error("no webhook URL configured")]
    NotConfigured,
}

/// Delivers chat payloads.
pub trait WebhookSink {
    /// POSTs the payload once. No retry.
    fn send(&self, payload: &WebhookPayload) -> impl Future<Output = Result<(), WebhookError>> + Send;
}

impl<T: WebhookSink + Sync> WebhookSink for &T {
    fn send(&self, payload: &WebhookPayload) -> impl Future<Output = Result<(), WebhookError>> + Send {
        (**self).send(payload)
    }
}

/// A sink for runs without a webhook URL: every send fails with
/// [`WebhookError::NotConfigured`], which callers log and move past.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredSink;

impl WebhookSink for UnconfiguredSink {
    async fn send(&self, _payload: &WebhookPayload) -> Result<(), WebhookError> {
        Err(WebhookError::NotConfigured)
    }
}

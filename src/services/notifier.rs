use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while delivering a notification
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Webhook returned error: {0}")]
    ApiError(String),
}

/// Events the engine reports to users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    MatchesGenerated,
    MatchContacted,
    MatchAccepted,
    MatchDeclined,
}

/// Fire-and-forget notification sink
///
/// Calls return immediately and never fail; delivery problems stay inside
/// the implementation.
pub trait Notifier: Send + Sync {
    fn notify(&self, user_id: &str, event: NotificationEvent, payload: Value);
}

/// Notifier that only writes to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user_id: &str, event: NotificationEvent, payload: Value) {
        tracing::info!(user_id = %user_id, event = ?event, payload = %payload, "Notification");
    }
}

#[derive(Debug, Serialize)]
struct WebhookBody<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    event: NotificationEvent,
    payload: &'a Value,
}

/// Notifier that POSTs events to the notification service
///
/// Each call spawns its delivery onto the Tokio runtime. Must be used from
/// within a runtime.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    url: String,
    client: Client,
}

impl WebhookNotifier {
    pub fn new(url: String, timeout: Duration) -> Result<Self, NotifierError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { url, client })
    }

    /// Deliver one event and wait for the webhook's answer
    pub async fn deliver(
        &self,
        user_id: &str,
        event: NotificationEvent,
        payload: &Value,
    ) -> Result<(), NotifierError> {
        let response = self
            .client
            .post(&self.url)
            .json(&WebhookBody {
                user_id,
                event,
                payload,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NotifierError::ApiError(format!(
                "Failed to deliver notification: {}",
                response.status()
            )));
        }

        tracing::debug!(user_id = %user_id, event = ?event, "Delivered notification");
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn notify(&self, user_id: &str, event: NotificationEvent, payload: Value) {
        let notifier = self.clone();
        let user_id = user_id.to_string();

        tokio::spawn(async move {
            if let Err(e) = notifier.deliver(&user_id, event, &payload).await {
                tracing::warn!(user_id = %user_id, event = ?event, "Notification delivery failed: {}", e);
            }
        });
    }
}

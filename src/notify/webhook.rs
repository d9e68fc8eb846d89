//! Webhook sinks.

use std::time::Duration;

use reqwest::Client;

use super::{WebhookError, WebhookPayload, WebhookSink};

/// Default connect timeout for webhook delivery.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Default overall request timeout for webhook delivery.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Posts payloads to a Slack incoming-webhook URL.
#[derive(Clone)]
pub struct SlackWebhook {
    url: String,
    client: Client,
}

impl SlackWebhook {
    /// Builds a sink with the default timeouts.
    pub fn new(url: impl Into<String>) -> Result<Self, WebhookError> {
        Self::with_timeouts(url, DEFAULT_CONNECT_TIMEOUT, DEFAULT_REQUEST_TIMEOUT)
    }

    pub fn with_timeouts(
        url: impl Into<String>,
        connect_timeout: Duration,
        request_timeout: Duration,
    ) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .build()
            .map_err(|e| WebhookError::Transport(e.to_string()))?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }
}

impl std::fmt::Debug for SlackWebhook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The URL is a credential.
        f.debug_struct("SlackWebhook").finish_non_exhaustive()
    }
}

impl WebhookSink for SlackWebhook {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(&self.url)
            .json(payload)
            .send()
            .await
            .map_err(|e| WebhookError::Transport(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(status = status.as_u16(), "Webhook delivered");
            Ok(())
        } else {
            Err(WebhookError::Status(status.as_u16()))
        }
    }
}

/// Logs payloads instead of sending them. Used for dry runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingSink;

impl WebhookSink for LoggingSink {
    async fn send(&self, payload: &WebhookPayload) -> Result<(), WebhookError> {
        let body = serde_json::to_string(payload).unwrap_or_else(|_| payload.text.clone());
        tracing::info!(payload = %body, "[dry-run] Skipping webhook delivery");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;

    type Received = Arc<Mutex<Vec<serde_json::Value>>>;

    /// Serves `POST /hook` answering `status`, recording each JSON body.
    async fn spawn_endpoint(status: u16, delay: Duration) -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/hook",
                post(
                    move |State(received): State<Received>,
                          axum::Json(body): axum::Json<serde_json::Value>| async move {
                        received.lock().unwrap().push(body);
                        tokio::time::sleep(delay).await;
                        StatusCode::from_u16(status).unwrap()
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/hook", addr), received)
    }

    #[tokio::test]
    async fn success_status_is_delivered() {
        let (url, received) = spawn_endpoint(200, Duration::ZERO).await;
        let sink = SlackWebhook::new(url).unwrap();

        sink.send(&WebhookPayload::text("PR ready")).await.unwrap();

        let bodies = received.lock().unwrap().clone();
        assert_eq!(bodies, vec![serde_json::json!({ "text": "PR ready" })]);
    }

    #[tokio::test]
    async fn server_error_is_reported() {
        let (url, received) = spawn_endpoint(500, Duration::ZERO).await;
        let sink = SlackWebhook::new(url).unwrap();

        let err = sink.send(&WebhookPayload::text("x")).await.unwrap_err();

        assert_eq!(err, WebhookError::Status(500));
        // Sent exactly once: no retry on failure.
        assert_eq!(received.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn timeout_is_a_transport_error() {
        let (url, _) = spawn_endpoint(200, Duration::from_secs(5)).await;
        let sink = SlackWebhook::with_timeouts(
            url,
            Duration::from_secs(1),
            Duration::from_millis(200),
        )
        .unwrap();

        let err = sink.send(&WebhookPayload::text("x")).await.unwrap_err();
        assert!(matches!(err, WebhookError::Transport(_)));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Bind then drop to get a port nothing listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let sink = SlackWebhook::new(format!("http://{}/hook", addr)).unwrap();
        let err = sink.send(&WebhookPayload::text("x")).await.unwrap_err();
        assert!(matches!(err, WebhookError::Transport(_)));
    }

    #[tokio::test]
    async fn logging_sink_always_succeeds() {
        LoggingSink.send(&WebhookPayload::text("x")).await.unwrap();
    }
}

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use clout_types::models::PushSubscription;

#[derive(Debug, Clone, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub data: PushData,
}

#[derive(Debug, Clone, Serialize)]
pub struct PushData {
    pub url: String,
}

#[derive(Debug, Error)]
pub enum PushError {
    /// The provider reports the endpoint permanently gone; the caller
    /// retires the subscription.
    #[error("push endpoint permanently gone")]
    Gone,
    #[error("push provider returned status {0}")]
    Provider(u16),
    #[error("push transport error: {0}")]
    Transport(String),
}

/// Delivery through the external push provider. Implementations must not
/// retry; delivery is best-effort and at-most-once from this side.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &PushPayload)
    -> Result<(), PushError>;
}

/// Posts the payload to the subscription's endpoint, authenticated with
/// the provider server key.
pub struct HttpPushClient {
    http: reqwest::Client,
    server_key: String,
}

impl HttpPushClient {
    pub fn new(server_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_key,
        }
    }
}

#[async_trait]
impl PushProvider for HttpPushClient {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        let resp = self
            .http
            .post(&subscription.endpoint)
            .header("Authorization", format!("key={}", self.server_key))
            .header("TTL", "2419200")
            .json(payload)
            .send()
            .await
            .map_err(|e| PushError::Transport(e.to_string()))?;

        let status = resp.status();
        debug!(
            "Push delivery to {} for user {}: {}",
            subscription.endpoint, subscription.user_id, status
        );

        match status.as_u16() {
            200..=299 => Ok(()),
            404 | 410 => Err(PushError::Gone),
            code => Err(PushError::Provider(code)),
        }
    }
}

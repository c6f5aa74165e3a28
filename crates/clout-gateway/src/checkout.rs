use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("checkout transport error: {0}")]
    Transport(String),
    #[error("checkout provider returned status {0}")]
    Provider(u16),
    #[error("malformed checkout response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: String,
}

/// Client for the external checkout provider. Holds the API secret key;
/// the webhook secret lives with the webhook handler, not here.
pub struct CheckoutClient {
    http: reqwest::Client,
    api_base: String,
    secret_key: String,
}

impl CheckoutClient {
    pub fn new(api_base: String, secret_key: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base,
            secret_key,
        }
    }

    /// Create a hosted checkout session. The `{userId, priceId}` metadata
    /// is opaque to the provider and comes back verbatim on settlement.
    pub async fn create_session(
        &self,
        user_id: &str,
        price_id: &str,
        success_url: &str,
        cancel_url: &str,
    ) -> Result<CheckoutSession, CheckoutError> {
        let form = [
            ("mode", "payment"),
            ("line_items[0][price]", price_id),
            ("line_items[0][quantity]", "1"),
            ("success_url", success_url),
            ("cancel_url", cancel_url),
            ("metadata[userId]", user_id),
            ("metadata[priceId]", price_id),
        ];

        let resp = self
            .http
            .post(format!("{}/v1/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(&form)
            .send()
            .await
            .map_err(|e| CheckoutError::Transport(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(CheckoutError::Provider(resp.status().as_u16()));
        }

        resp.json()
            .await
            .map_err(|e| CheckoutError::Malformed(e.to_string()))
    }
}

/// Verify the webhook signature: hex-encoded HMAC-SHA256 over the raw
/// request body, keyed with the shared webhook secret. Constant-time
/// comparison via the mac itself.
pub fn verify_signature(webhook_secret: &str, body: &[u8], signature_hex: &str) -> bool {
    let sig = match hex::decode(signature_hex.trim()) {
        Ok(s) => s,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(webhook_secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(body);
    mac.verify_slice(&sig).is_ok()
}

/// Test/tooling helper: produce the signature `verify_signature` expects.
pub fn sign_body(webhook_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(webhook_secret.as_bytes())
        .expect("hmac accepts any key length");
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_roundtrip() {
        let secret = "whsec_test";
        let body = br#"{"id":"evt_1","type":"checkout.session.completed"}"#;
        let sig = sign_body(secret, body);
        assert!(verify_signature(secret, body, &sig));
    }

    #[test]
    fn tampered_body_rejected() {
        let secret = "whsec_test";
        let sig = sign_body(secret, b"original");
        assert!(!verify_signature(secret, b"tampered", &sig));
    }

    #[test]
    fn wrong_secret_rejected() {
        let sig = sign_body("whsec_a", b"payload");
        assert!(!verify_signature("whsec_b", b"payload", &sig));
    }

    #[test]
    fn garbage_signature_rejected() {
        assert!(!verify_signature("whsec_test", b"payload", "not-hex!!"));
        assert!(!verify_signature("whsec_test", b"payload", ""));
    }
}

use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use bytes::Bytes;
use tracing::{info, warn};

use clout_gateway::checkout::verify_signature;
use clout_types::api::{Claims, CreateCheckoutRequest, CreateCheckoutResponse};
use clout_types::events::CheckoutEvent;

use crate::AppState;
use crate::error::ApiError;

/// Header carrying the hex HMAC-SHA256 signature over the raw body.
pub const SIGNATURE_HEADER: &str = "x-checkout-signature";

/// The settlement event kind that carries a grant.
const COMPLETED_KIND: &str = "checkout.session.completed";

/// Static price → coin table. Unknown price ids settle to nothing.
const PRICE_TABLE: &[(&str, i64)] = &[
    ("price_1RhofqPFixwUyCR6M4TTJGL9", 100),
    ("price_1RhogVPFixwUyCR6vVhZqsJc", 500),
    ("price_1RhohDPFixwUyCR6cy0rDpIq", 1000),
];

pub fn coins_for_price(price_id: &str) -> Option<i64> {
    PRICE_TABLE
        .iter()
        .find(|(id, _)| *id == price_id)
        .map(|(_, coins)| *coins)
}

/// Create a hosted checkout session for the authenticated caller.
pub async fn create_checkout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<CreateCheckoutRequest>,
) -> Result<Json<CreateCheckoutResponse>, ApiError> {
    let checkout = state
        .checkout
        .as_ref()
        .ok_or(ApiError::FailedPrecondition(
            "payment backend is not configured".into(),
        ))?;

    if req.price_id.is_empty() || req.success_url.is_empty() || req.cancel_url.is_empty() {
        return Err(ApiError::InvalidArgument(
            "price_id, success_url and cancel_url are required".into(),
        ));
    }

    let session = checkout
        .create_session(&claims.sub, &req.price_id, &req.success_url, &req.cancel_url)
        .await
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("checkout session: {e}")))?;

    info!(
        "Checkout session {} created for user {}",
        session.id, claims.sub
    );

    Ok(Json(CreateCheckoutResponse {
        session_id: session.id,
        session_url: session.url,
    }))
}

/// Settlement webhook. Signature failures reject with 400 and touch
/// nothing; once the signature verifies we answer 200 whether or not a
/// grant applied, so the provider stops retrying semantically-skipped
/// events. Replays of a granted event are absorbed by the dedup ledger.
pub async fn webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<StatusCode, ApiError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or(ApiError::Misconfigured("webhook secret is not configured"))?;

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::SignatureInvalid)?;

    if !verify_signature(secret, &body, signature) {
        return Err(ApiError::SignatureInvalid);
    }

    let event: CheckoutEvent = match serde_json::from_slice(&body) {
        Ok(ev) => ev,
        Err(e) => {
            warn!("Webhook body did not parse: {}", e);
            return Ok(StatusCode::OK);
        }
    };

    if event.kind != COMPLETED_KIND {
        return Ok(StatusCode::OK);
    }

    let metadata = event.data.object.metadata;
    let (user_id, price_id) = match (metadata.user_id, metadata.price_id) {
        (Some(u), Some(p)) => (u, p),
        _ => {
            warn!("Completed session {} missing metadata, no grant", event.id);
            return Ok(StatusCode::OK);
        }
    };

    let coins = match coins_for_price(&price_id) {
        Some(c) => c,
        None => {
            warn!(
                "Completed session {} carries unknown price id {}, no grant",
                event.id, price_id
            );
            return Ok(StatusCode::OK);
        }
    };

    // Storage failure here is a 500: the grant did not happen and the
    // provider's retry will land safely on the dedup ledger.
    let granted = state.ledger.settle_grant(&event.id, &user_id, coins)?;
    if granted {
        info!(
            "Settled event {}: granted {} coins to user {}",
            event.id, coins, user_id
        );
    }

    Ok(StatusCode::OK)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use clout_gateway::checkout::sign_body;

    fn signed_headers(secret: &str, body: &[u8]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            SIGNATURE_HEADER,
            sign_body(secret, body).parse().unwrap(),
        );
        headers
    }

    fn completed_event(event_id: &str, user_id: &str, price_id: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "id": event_id,
            "type": "checkout.session.completed",
            "data": { "object": { "metadata": {
                "userId": user_id,
                "priceId": price_id,
            }}}
        }))
        .unwrap()
    }

    #[test]
    fn price_table_lookup() {
        assert_eq!(coins_for_price("price_1RhofqPFixwUyCR6M4TTJGL9"), Some(100));
        assert_eq!(coins_for_price("price_1RhogVPFixwUyCR6vVhZqsJc"), Some(500));
        assert_eq!(coins_for_price("price_unknown"), None);
    }

    #[tokio::test]
    async fn completed_event_grants_exactly_once() {
        let state = testing::state();
        state.db.create_user("u1", "alpha").unwrap();

        let body = completed_event("evt_1", "u1", "price_1RhofqPFixwUyCR6M4TTJGL9");
        let headers = signed_headers("whsec_test", &body);

        let status = webhook(
            State(state.clone()),
            headers.clone(),
            Bytes::from(body.clone()),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.db.get_user("u1").unwrap().unwrap().clout_coin, 100);

        // Provider retries the identical delivery.
        let status = webhook(State(state.clone()), headers, Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.db.get_user("u1").unwrap().unwrap().clout_coin, 100);
    }

    #[tokio::test]
    async fn bad_signature_rejected_without_side_effect() {
        let state = testing::state();
        state.db.create_user("u1", "alpha").unwrap();

        let body = completed_event("evt_1", "u1", "price_1RhofqPFixwUyCR6M4TTJGL9");
        let headers = signed_headers("wrong-secret", &body);

        let err = webhook(State(state.clone()), headers, Bytes::from(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SignatureInvalid));
        assert_eq!(state.db.get_user("u1").unwrap().unwrap().clout_coin, 0);
    }

    #[tokio::test]
    async fn missing_signature_header_rejected() {
        let state = testing::state();
        let body = completed_event("evt_1", "u1", "price_1RhofqPFixwUyCR6M4TTJGL9");

        let err = webhook(State(state), HeaderMap::new(), Bytes::from(body))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::SignatureInvalid));
    }

    #[tokio::test]
    async fn unconfigured_secret_is_500() {
        let mut builder = testing::StateBuilder::new();
        builder.webhook_secret = None;
        let state = builder.build();

        let err = webhook(State(state), HeaderMap::new(), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Misconfigured(_)));
    }

    #[tokio::test]
    async fn unknown_price_acknowledged_without_grant() {
        let state = testing::state();
        state.db.create_user("u1", "alpha").unwrap();

        let body = completed_event("evt_1", "u1", "price_discontinued");
        let headers = signed_headers("whsec_test", &body);

        let status = webhook(State(state.clone()), headers, Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(state.db.get_user("u1").unwrap().unwrap().clout_coin, 0);
    }

    #[tokio::test]
    async fn other_event_kinds_acknowledged() {
        let state = testing::state();
        let body = serde_json::to_vec(&serde_json::json!({
            "id": "evt_9",
            "type": "checkout.session.expired",
            "data": { "object": {} }
        }))
        .unwrap();
        let headers = signed_headers("whsec_test", &body);

        let status = webhook(State(state), headers, Bytes::from(body))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn distinct_events_accumulate() {
        let state = testing::state();
        state.db.create_user("u1", "alpha").unwrap();

        for (event_id, price) in [
            ("evt_1", "price_1RhofqPFixwUyCR6M4TTJGL9"),
            ("evt_2", "price_1RhogVPFixwUyCR6vVhZqsJc"),
        ] {
            let body = completed_event(event_id, "u1", price);
            let headers = signed_headers("whsec_test", &body);
            webhook(State(state.clone()), headers, Bytes::from(body))
                .await
                .unwrap();
        }

        assert_eq!(state.db.get_user("u1").unwrap().unwrap().clout_coin, 600);
    }

    #[tokio::test]
    async fn unconfigured_checkout_fails_precondition() {
        let state = testing::state();
        let err = create_checkout(
            State(state),
            Extension(Claims {
                sub: "u1".into(),
                username: "alpha".into(),
                exp: 0,
            }),
            Json(CreateCheckoutRequest {
                price_id: "price_1RhofqPFixwUyCR6M4TTJGL9".into(),
                success_url: "https://app.example/ok".into(),
                cancel_url: "https://app.example/no".into(),
            }),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ApiError::FailedPrecondition(_)));
    }
}

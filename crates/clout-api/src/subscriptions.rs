use axum::{Extension, Json, extract::State};

use clout_types::api::{Claims, SubscribeRequest};

use crate::AppState;
use crate::error::ApiError;

/// Register (or replace) the caller's push subscription. One live
/// subscription per user; the latest registration wins.
pub async fn subscribe(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(req): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if req.endpoint.is_empty() || req.p256dh.is_empty() || req.auth.is_empty() {
        return Err(ApiError::InvalidArgument(
            "endpoint and key material are required".into(),
        ));
    }

    state
        .db
        .upsert_subscription(&claims.sub, &req.endpoint, &req.p256dh, &req.auth)?;

    Ok(Json(serde_json::json!({ "success": true })))
}

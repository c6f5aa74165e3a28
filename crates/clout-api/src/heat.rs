use axum::{Json, extract::State};
use serde_json::{Value, json};
use tracing::{info, warn};

use clout_db::ledger::AnalyzeOutcome;
use clout_gateway::classifier::SafeSearchVerdict;
use clout_types::events::StorageObjectEvent;

use crate::AppState;

/// Coins granted to the author when a post runs hot.
pub const HEAT_REWARD_COINS: i64 = 25;

/// Object namespaces the analyzer cares about.
const FEED_PREFIX: &str = "feed/";
const AVATAR_PREFIX: &str = "avatars/";
const THUMB_MARKER: &str = "thumb_";

/// `2·[racy ≥ likely] + 2·[adult ≥ likely]` — each signal contributes 0
/// or 2, so the domain is {0, 2, 4}.
pub fn heat_from_verdict(verdict: &SafeSearchVerdict) -> i64 {
    let racy = if verdict.racy.at_least_likely() { 2 } else { 0 };
    let adult = if verdict.adult.at_least_likely() { 2 } else { 0 };
    racy + adult
}

/// Owning post id for a feed image path `feed/{post_id}/{object}`.
fn post_id_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(FEED_PREFIX)?;
    let id = rest.split('/').next()?;
    if id.is_empty() { None } else { Some(id) }
}

fn object_basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Storage finalize trigger. Trigger-style semantics: filters and external
/// failures are logged and swallowed, never surfaced; the event source
/// does not retry on our behalf.
pub async fn storage_event(
    State(state): State<AppState>,
    Json(event): Json<StorageObjectEvent>,
) -> Json<Value> {
    let processed = handle_storage_event(&state, &event).await;
    Json(json!({ "processed": processed }))
}

async fn handle_storage_event(state: &AppState, event: &StorageObjectEvent) -> bool {
    if !event.content_type.starts_with("image/") {
        return false;
    }

    // Avatar thumbnails: record the derived URL on the user document.
    if let Some(rest) = event.name.strip_prefix(AVATAR_PREFIX) {
        if object_basename(&event.name).starts_with(THUMB_MARKER) {
            let user_id = match rest.split('/').next() {
                Some(id) if !id.is_empty() => id,
                _ => return false,
            };
            let url = format!(
                "https://storage.googleapis.com/{}/{}",
                event.bucket, event.name
            );
            match state.db.set_thumb_url(user_id, &url) {
                Ok(true) => info!("Thumbnail recorded for user {}", user_id),
                Ok(false) => warn!("Thumbnail for unknown user {}", user_id),
                Err(e) => warn!("Failed to record thumbnail for {}: {:#}", user_id, e),
            }
        }
        return false;
    }

    if !event.name.starts_with(FEED_PREFIX) {
        return false;
    }
    // Never reprocess derived thumbnails.
    if object_basename(&event.name).starts_with(THUMB_MARKER) {
        return false;
    }

    let post_id = match post_id_from_path(&event.name) {
        Some(id) => id,
        None => return false,
    };

    let image_uri = format!("gs://{}/{}", event.bucket, event.name);
    let verdict = match state.classifier.safe_search(&image_uri).await {
        Ok(v) => v,
        Err(e) => {
            // Best-effort: the verdict is lost for this event.
            warn!("Safe-search classification failed for {}: {}", image_uri, e);
            return false;
        }
    };

    let heat = heat_from_verdict(&verdict);
    let reward = if heat > 1 { Some(HEAT_REWARD_COINS) } else { None };

    match state.ledger.analyze_post(post_id, heat, reward) {
        Ok(AnalyzeOutcome::Applied { rewarded }) => {
            info!(
                "Post {} analyzed: heat={}, rewarded={}",
                post_id, heat, rewarded
            );
            true
        }
        Ok(AnalyzeOutcome::AlreadyAnalyzed) => {
            info!("Post {} already analyzed, skipping", post_id);
            false
        }
        Ok(AnalyzeOutcome::NotFound) => {
            warn!("Storage event for unknown post {}", post_id);
            false
        }
        Err(e) => {
            warn!("Heat write failed for post {}: {:#}", post_id, e);
            false
        }
    }
}

use tracing::{info, warn};

use clout_gateway::push::{PushData, PushError, PushPayload};
use clout_types::models::PushSubscription;

use crate::AppStateInner;

pub const NOTIFY_TITLE: &str = "🔥 Someone whispered about you";
pub const NOTIFY_ICON: &str = "/favicon.svg";
const EXCERPT_CHARS: usize = 100;

/// First `max` characters, with an ellipsis when anything was cut.
pub fn excerpt(text: &str, max: usize) -> String {
    let mut out: String = text.chars().take(max).collect();
    if text.chars().count() > max {
        out.push('…');
    }
    out
}

/// Deliver a push notification for a freshly written comment. Best-effort
/// and at-most-once: no subscription means no-op, a permanently-gone
/// endpoint retires the subscription, anything else is logged and
/// swallowed. Never retried, never surfaced to the commenting caller.
pub async fn notify_comment(state: &AppStateInner, target_uid: &str, text: &str) {
    let row = match state.db.get_subscription(target_uid) {
        Ok(Some(row)) => row,
        Ok(None) => return,
        Err(e) => {
            warn!("Subscription lookup failed for {}: {:#}", target_uid, e);
            return;
        }
    };

    let subscription = PushSubscription {
        user_id: row.user_id,
        endpoint: row.endpoint,
        p256dh: row.p256dh,
        auth: row.auth,
    };

    let payload = PushPayload {
        title: NOTIFY_TITLE.into(),
        body: excerpt(text, EXCERPT_CHARS),
        icon: NOTIFY_ICON.into(),
        data: PushData {
            url: format!("/profile/{target_uid}"),
        },
    };

    match state.push.send(&subscription, &payload).await {
        Ok(()) => {
            info!("Push delivered to user {}", target_uid);
        }
        Err(PushError::Gone) => {
            // Dead endpoint: garbage-collect the subscription.
            info!("Push endpoint gone for user {}, retiring subscription", target_uid);
            if let Err(e) = state.db.delete_subscription(target_uid) {
                warn!("Failed to retire subscription for {}: {:#}", target_uid, e);
            }
        }
        Err(e) => {
            warn!("Push delivery to user {} failed: {}", target_uid, e);
        }
    }
}

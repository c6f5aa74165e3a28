use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed author id for posts synthesized by the gossip generator.
pub const GOSSIP_AUTHOR_ID: &str = "the-dumpster-oracle";

/// Heat score assigned to synthetic gossip posts. Real posts score 0–4,
/// so the sentinel sorts above every analyzed post in the feed.
pub const GOSSIP_HEAT_SENTINEL: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub geohash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub clout_score: i64,
    pub clout_coin: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumb_url: Option<String>,
    /// The "inner circle": up to six other user ids.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub top6: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoPoint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub syndicate_id: Option<String>,
    pub last_active: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// A feed entry. Created by a user posting or by the gossip generator;
/// mutated exactly once by the heat analyzer, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub caption: String,
    pub heat_score: i64,
    pub analyzed: bool,
    pub created_at: DateTime<Utc>,
}

/// An anonymous comment left on a user's profile. "Roast" is the legacy
/// name for the same record kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Whisper {
    pub id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// A user's registered push endpoint. At most one per user; the latest
/// registration wins. Retired when the provider reports it gone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushSubscription {
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Syndicate {
    pub id: String,
    pub name: String,
    pub tag: String,
    pub leader_id: String,
    pub treasury: i64,
    pub created_at: DateTime<Utc>,
}

use serde::{Deserialize, Serialize};

use crate::models::{Post, Syndicate, UserProfile, Whisper};

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the admin RPCs.
/// Canonical definition lives here in clout-types to eliminate duplication.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
}

// -- Ranking --

#[derive(Debug, Serialize)]
pub struct RankPairResponse {
    pub combatant1: UserProfile,
    pub combatant2: UserProfile,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VoteRequest {
    pub winner_id: String,
    pub loser_id: String,
}

#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub success: bool,
    pub message: String,
}

// -- Payments --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateCheckoutRequest {
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Debug, Serialize)]
pub struct CreateCheckoutResponse {
    pub session_id: String,
    pub session_url: String,
}

// -- Whispers --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WhisperRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct WhisperResponse {
    pub success: bool,
    pub message: String,
}

// -- Push subscriptions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

// -- Reads --

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub profile: UserProfile,
    pub whispers: Vec<Whisper>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<UserProfile>,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub posts: Vec<Post>,
}

#[derive(Debug, Serialize)]
pub struct SyndicateResponse {
    pub syndicate: Syndicate,
    pub members: Vec<UserProfile>,
    /// Recomputed from live member scores on every read; never stored.
    pub aggregate_score: i64,
}

// -- Admin --

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub success: bool,
    pub moved: usize,
}

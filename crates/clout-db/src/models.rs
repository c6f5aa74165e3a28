/// Database row types — these map directly to SQLite rows.
/// Distinct from the clout-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: String,
    pub username: String,
    pub clout_score: i64,
    pub clout_coin: i64,
    pub photo_url: Option<String>,
    pub video_url: Option<String>,
    pub thumb_url: Option<String>,
    /// JSON array of user ids, nullable in the schema.
    pub top6: Option<String>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub geohash: Option<String>,
    pub syndicate_id: Option<String>,
    pub last_active: String,
    pub created_at: String,
}

pub struct PostRow {
    pub id: String,
    pub author_id: String,
    pub caption: String,
    pub heat_score: i64,
    pub analyzed: bool,
    pub created_at: String,
}

pub struct WhisperRow {
    pub id: String,
    pub user_id: String,
    pub text: String,
    pub created_at: String,
}

pub struct SubscriptionRow {
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

pub struct SyndicateRow {
    pub id: String,
    pub name: String,
    pub tag: String,
    pub leader_id: String,
    pub treasury: i64,
    pub created_at: String,
}

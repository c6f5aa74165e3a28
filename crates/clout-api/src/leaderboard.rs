use axum::{Json, extract::State};

use clout_types::api::{FeedResponse, LeaderboardResponse};

use crate::AppState;
use crate::convert::{post_from_row, profile_from_row};
use crate::error::ApiError;

/// Only the top tier makes the board. Keeps the query fast and the
/// list exclusive.
const LEADERBOARD_SIZE: u32 = 100;

const FEED_PAGE: u32 = 50;

pub async fn get_leaderboard(
    State(state): State<AppState>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let leaderboard = state
        .db
        .top_users(LEADERBOARD_SIZE)?
        .into_iter()
        .map(profile_from_row)
        .collect();
    Ok(Json(LeaderboardResponse { leaderboard }))
}

/// The feed, hottest first. Synthetic gossip posts carry a sentinel heat
/// score and therefore pin to the top.
pub async fn get_feed(State(state): State<AppState>) -> Result<Json<FeedResponse>, ApiError> {
    let posts = state
        .db
        .posts_by_heat(FEED_PAGE)?
        .into_iter()
        .map(post_from_row)
        .collect();
    Ok(Json(FeedResponse { posts }))
}

use anyhow::anyhow;
use axum::{Json, extract::State};
use rand::Rng;

use clout_db::ledger::{LedgerField, LedgerOp};
use clout_types::api::{RankPairResponse, VoteRequest, VoteResponse};

use crate::AppState;
use crate::convert::profile_from_row;
use crate::error::ApiError;

/// Bounded candidate page for pair selection. Sampling from the top of
/// the board keeps the read O(page) instead of O(population).
pub const CANDIDATE_PAGE: u32 = 20;

/// Pick two distinct indices in `0..len` by rejection sampling. Expected
/// O(1) resamples for len > 1; callers must fail fast on len < 2 instead
/// of reaching this.
pub fn pick_two_distinct<R: Rng>(len: usize, rng: &mut R) -> (usize, usize) {
    debug_assert!(len >= 2);
    let first = rng.random_range(0..len);
    let mut second = rng.random_range(0..len);
    while second == first {
        second = rng.random_range(0..len);
    }
    (first, second)
}

/// Serve two distinct combatants for the caller to judge.
pub async fn load_pair(State(state): State<AppState>) -> Result<Json<RankPairResponse>, ApiError> {
    let rows = state.db.top_users(CANDIDATE_PAGE)?;
    if rows.len() < 2 {
        return Err(ApiError::FailedPrecondition(
            "not enough users to rank".into(),
        ));
    }

    let profiles: Vec<_> = rows.into_iter().map(profile_from_row).collect();
    let (first, second) = pick_two_distinct(profiles.len(), &mut rand::rng());

    Ok(Json(RankPairResponse {
        combatant1: profiles[first].clone(),
        combatant2: profiles[second].clone(),
    }))
}

/// Apply a vote: winner +1, loser −1, both in one atomic batch so the
/// deltas land together or not at all.
pub async fn vote(
    State(state): State<AppState>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, ApiError> {
    let winner = req.winner_id.trim().to_string();
    let loser = req.loser_id.trim().to_string();

    if winner.is_empty() || loser.is_empty() {
        return Err(ApiError::InvalidArgument(
            "invalid vote: a choice must be made".into(),
        ));
    }
    if winner == loser {
        return Err(ApiError::InvalidArgument(
            "invalid vote: winner and loser must differ".into(),
        ));
    }

    // Run blocking DB work off the async runtime
    let st = state.clone();
    tokio::task::spawn_blocking(move || -> Result<(), ApiError> {
        for id in [&winner, &loser] {
            if st.db.get_user(id)?.is_none() {
                return Err(ApiError::NotFound(format!("user {id}")));
            }
        }
        st.ledger.batch(&[
            LedgerOp {
                user_id: winner.clone(),
                field: LedgerField::Score,
                delta: 1,
            },
            LedgerOp {
                user_id: loser.clone(),
                field: LedgerField::Score,
                delta: -1,
            },
        ])?;
        Ok(())
    })
    .await
    .map_err(|e| ApiError::Internal(anyhow!("spawn_blocking join error: {e}")))??;

    Ok(Json(VoteResponse {
        success: true,
        message: "Judgment has been rendered.".into(),
    }))
}

use axum::{
    Json,
    extract::{Path, State},
};

use clout_types::api::SyndicateResponse;

use crate::AppState;
use crate::convert::{profile_from_row, syndicate_from_row};
use crate::error::ApiError;

/// Syndicate read. The aggregate score is a materialized view over live
/// member scores, recomputed on every read. It is never stored, so it
/// cannot drift out of sync with the ledger.
pub async fn get_syndicate(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SyndicateResponse>, ApiError> {
    let row = state
        .db
        .get_syndicate(&id)?
        .ok_or_else(|| ApiError::NotFound(format!("syndicate {id}")))?;

    let members: Vec<_> = state
        .db
        .syndicate_members(&id)?
        .into_iter()
        .map(profile_from_row)
        .collect();

    let aggregate_score = members.iter().map(|m| m.clout_score).sum();

    Ok(Json(SyndicateResponse {
        syndicate: syndicate_from_row(row),
        members,
        aggregate_score,
    }))
}

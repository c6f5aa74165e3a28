use axum::{Extension, Json, extract::State};
use tracing::info;

use clout_types::api::{Claims, MigrateResponse};

use crate::AppState;
use crate::error::ApiError;

/// One-time admin move of every legacy roast into whispers. The whole
/// move is a single transaction; re-running after success finds an empty
/// source and moves nothing.
pub async fn migrate_roasts(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MigrateResponse>, ApiError> {
    let moved = state.db.migrate_roasts_to_whispers()?;
    info!(
        "Roast migration run by {} moved {} comments",
        claims.sub, moved
    );
    Ok(Json(MigrateResponse {
        success: true,
        moved,
    }))
}

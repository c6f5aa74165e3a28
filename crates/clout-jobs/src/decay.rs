use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use clout_db::ledger::{Ledger, LedgerField, LedgerOp};
use clout_db::{Database, format_ts};

/// Flat policy: a 5 point deduction. Brutal and simple.
pub const FLAT_DECAY_POINTS: i64 = 5;
pub const FLAT_INACTIVITY_HOURS: i64 = 48;

/// Drift policy: multiply down and keep the receipts on the row.
pub const DRIFT_FACTOR: f64 = 0.95;
pub const DRIFT_INACTIVITY_HOURS: i64 = 24;

/// The two decay laws. Distinct policies selected at startup: one per
/// deployment, never merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayPolicy {
    Flat,
    Drift,
}

/// Background task that decays the scores of inactive users.
///
/// Each run is independent; a failed run logs and waits for the next
/// tick. Failures never escape the loop.
pub async fn run_decay_loop(
    db: Arc<Database>,
    ledger: Ledger,
    policy: DecayPolicy,
    interval: Duration,
) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        let now = Utc::now();
        let result = match policy {
            DecayPolicy::Flat => flat_decay(&db, &ledger, now),
            DecayPolicy::Drift => drift_decay(&db, &ledger, now),
        };

        match result {
            Ok(0) => info!("Decay run ({:?}): no eligible users", policy),
            Ok(n) => info!("Decay run ({:?}): decayed {} users", policy, n),
            Err(e) => warn!("Decay run ({:?}) failed: {:#}", policy, e),
        }
    }
}

/// Flat decay: every user inactive for 48 hours loses 5 points, all in
/// one atomic batch. No floor under the default score policy.
pub fn flat_decay(
    db: &Database,
    ledger: &Ledger,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let cutoff = format_ts(now - chrono::Duration::hours(FLAT_INACTIVITY_HOURS));
    let ids = db.users_inactive_since(&cutoff)?;
    if ids.is_empty() {
        return Ok(0);
    }

    let ops: Vec<LedgerOp> = ids
        .into_iter()
        .map(|user_id| LedgerOp {
            user_id,
            field: LedgerField::Score,
            delta: -FLAT_DECAY_POINTS,
        })
        .collect();

    ledger.batch(&ops)?;
    Ok(ops.len())
}

/// Percentage drift: users inactive for 24 hours with a positive score
/// slide to `floor(score × 0.95)`. The write is a compare-and-swap
/// against the score we read; a concurrent vote or decay wins, and that
/// user is skipped until the next run.
pub fn drift_decay(
    db: &Database,
    ledger: &Ledger,
    now: DateTime<Utc>,
) -> anyhow::Result<usize> {
    let cutoff = format_ts(now - chrono::Duration::hours(DRIFT_INACTIVITY_HOURS));
    let drifted_at = format_ts(now);

    let mut applied = 0;
    for (user_id, score) in db.users_for_drift(&cutoff)? {
        let new_score = (score as f64 * DRIFT_FACTOR).floor() as i64;
        if new_score == score {
            continue;
        }
        let lost = score - new_score;

        if ledger.drift_score_cas(&user_id, score, new_score, lost, &drifted_at)? {
            applied += 1;
        } else {
            warn!(
                "Drift skipped for {}: score moved under us this run",
                user_id
            );
        }
    }

    Ok(applied)
}

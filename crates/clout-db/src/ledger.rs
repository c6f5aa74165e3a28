use std::sync::Arc;

use anyhow::{Result, anyhow};
use tracing::info;

use crate::Database;

/// The two numeric fields the ledger is allowed to touch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerField {
    Score,
    Coin,
}

impl LedgerField {
    fn column(self) -> &'static str {
        match self {
            LedgerField::Score => "clout_score",
            LedgerField::Coin => "clout_coin",
        }
    }
}

/// Named policy for the lower bound of the score. `Unbounded` is the
/// historical behavior: losing votes and flat decay can push a score
/// arbitrarily negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreFloor {
    Unbounded,
    ClampAtZero,
}

#[derive(Debug, Clone)]
pub struct LedgerOp {
    pub user_id: String,
    pub field: LedgerField,
    pub delta: i64,
}

/// Outcome of a heat-analysis write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzeOutcome {
    /// Heat and analyzed flag written; `rewarded` says whether a coin
    /// grant went to the author in the same transaction.
    Applied { rewarded: bool },
    /// The post was already analyzed; nothing written, nothing granted.
    AlreadyAnalyzed,
    NotFound,
}

/// The authoritative operations over user balances. All mutation of
/// clout_score and clout_coin in this codebase goes through here.
///
/// Deltas are issued as atomic in-place increments (no prior read), so
/// concurrent writers commute regardless of interleaving. The one
/// non-commuting form, the drift write, goes through a compare-and-swap.
#[derive(Clone)]
pub struct Ledger {
    db: Arc<Database>,
    floor: ScoreFloor,
}

impl Ledger {
    pub fn new(db: Arc<Database>, floor: ScoreFloor) -> Self {
        Self { db, floor }
    }

    pub fn floor(&self) -> ScoreFloor {
        self.floor
    }

    fn delta_sql(&self, field: LedgerField) -> &'static str {
        match (field, self.floor) {
            (LedgerField::Score, ScoreFloor::ClampAtZero) => {
                "UPDATE users SET clout_score = MAX(clout_score + ?1, 0) WHERE id = ?2"
            }
            (LedgerField::Score, ScoreFloor::Unbounded) => {
                "UPDATE users SET clout_score = clout_score + ?1 WHERE id = ?2"
            }
            // Coin balance is intended non-negative but not structurally
            // enforced; grants are always positive in practice.
            (LedgerField::Coin, _) => {
                "UPDATE users SET clout_coin = clout_coin + ?1 WHERE id = ?2"
            }
        }
    }

    /// Apply a signed delta as an in-place increment. Errors when the
    /// user does not exist.
    pub fn apply_delta(&self, user_id: &str, field: LedgerField, delta: i64) -> Result<()> {
        let sql = self.delta_sql(field);
        self.db.with_conn(|conn| {
            let n = conn.execute(sql, rusqlite::params![delta, user_id])?;
            if n == 0 {
                return Err(anyhow!("ledger: unknown user {}", user_id));
            }
            Ok(())
        })
    }

    /// Overwrite a field with a value computed from a prior read. Callers
    /// of this form are exposed to lost updates under concurrent writers;
    /// the drift path uses `drift_score_cas` instead.
    pub fn apply_absolute(&self, user_id: &str, field: LedgerField, value: i64) -> Result<()> {
        let sql = format!("UPDATE users SET {} = ?1 WHERE id = ?2", field.column());
        self.db.with_conn(|conn| {
            let n = conn.execute(&sql, rusqlite::params![value, user_id])?;
            if n == 0 {
                return Err(anyhow!("ledger: unknown user {}", user_id));
            }
            Ok(())
        })
    }

    /// Commit every op in one transaction — all or none. An op that
    /// matches no user aborts the whole batch.
    pub fn batch(&self, ops: &[LedgerOp]) -> Result<()> {
        if ops.is_empty() {
            return Ok(());
        }
        let sqls: Vec<&'static str> = ops.iter().map(|op| self.delta_sql(op.field)).collect();
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            for (op, sql) in ops.iter().zip(&sqls) {
                let n = tx.execute(sql, rusqlite::params![op.delta, op.user_id])?;
                if n == 0 {
                    return Err(anyhow!("ledger: unknown user {} in batch", op.user_id));
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// Conditional drift write: overwrite the score only if it still holds
    /// the value the scheduler read. Records the points lost and the drift
    /// timestamp on the same row. Returns false when a concurrent writer
    /// moved the score first — the caller skips that user this run.
    pub fn drift_score_cas(
        &self,
        user_id: &str,
        observed: i64,
        new_score: i64,
        lost: i64,
        at: &str,
    ) -> Result<bool> {
        self.db.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET clout_score = ?1, last_drift_amount = ?2, last_drift_at = ?3
                 WHERE id = ?4 AND clout_score = ?5",
                rusqlite::params![new_score, lost, at, user_id, observed],
            )?;
            Ok(n > 0)
        })
    }

    /// Settlement grant guarded by the processed-events ledger. The event
    /// id claim and the coin grant commit together; a replayed delivery
    /// finds the id already claimed and grants nothing.
    pub fn settle_grant(&self, event_id: &str, user_id: &str, amount: i64) -> Result<bool> {
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let claimed = tx.execute(
                "INSERT OR IGNORE INTO processed_events (id) VALUES (?1)",
                [event_id],
            )?;
            if claimed == 0 {
                info!("Settlement event {} already processed, skipping grant", event_id);
                tx.commit()?;
                return Ok(false);
            }
            let n = tx.execute(
                "UPDATE users SET clout_coin = clout_coin + ?1 WHERE id = ?2",
                rusqlite::params![amount, user_id],
            )?;
            if n == 0 {
                return Err(anyhow!("settlement for unknown user {}", user_id));
            }
            tx.commit()?;
            Ok(true)
        })
    }

    /// Write the heat verdict exactly once. The analyzed flag is checked
    /// inside the transaction, so re-delivered storage events neither
    /// rewrite the post nor re-grant the reward.
    pub fn analyze_post(
        &self,
        post_id: &str,
        heat_score: i64,
        reward: Option<i64>,
    ) -> Result<AnalyzeOutcome> {
        self.db.with_conn_mut(|conn| {
            let tx = conn.transaction()?;

            let found: Option<(String, bool)> = {
                let mut stmt =
                    tx.prepare("SELECT author_id, analyzed FROM posts WHERE id = ?1")?;
                match stmt.query_row([post_id], |row| Ok((row.get(0)?, row.get(1)?))) {
                    Ok(v) => Some(v),
                    Err(rusqlite::Error::QueryReturnedNoRows) => None,
                    Err(e) => return Err(e.into()),
                }
            };

            let (author_id, analyzed) = match found {
                Some(v) => v,
                None => return Ok(AnalyzeOutcome::NotFound),
            };
            if analyzed {
                return Ok(AnalyzeOutcome::AlreadyAnalyzed);
            }

            tx.execute(
                "UPDATE posts SET heat_score = ?1, analyzed = 1 WHERE id = ?2",
                rusqlite::params![heat_score, post_id],
            )?;

            let rewarded = match reward {
                Some(coins) => {
                    tx.execute(
                        "UPDATE users SET clout_coin = clout_coin + ?1 WHERE id = ?2",
                        rusqlite::params![coins, author_id],
                    )?;
                    true
                }
                None => false,
            };

            tx.commit()?;
            Ok(AnalyzeOutcome::Applied { rewarded })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ledger() -> Ledger {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.create_user("u1", "alpha").unwrap();
        db.create_user("u2", "bravo").unwrap();
        Ledger::new(db.clone(), ScoreFloor::Unbounded)
    }

    fn score(ledger: &Ledger, id: &str) -> i64 {
        ledger.db.get_user(id).unwrap().unwrap().clout_score
    }

    fn coin(ledger: &Ledger, id: &str) -> i64 {
        ledger.db.get_user(id).unwrap().unwrap().clout_coin
    }

    #[test]
    fn deltas_accumulate() {
        let l = ledger();
        l.apply_delta("u1", LedgerField::Score, 3).unwrap();
        l.apply_delta("u1", LedgerField::Score, -1).unwrap();
        l.apply_delta("u1", LedgerField::Coin, 25).unwrap();
        assert_eq!(score(&l, "u1"), 2);
        assert_eq!(coin(&l, "u1"), 25);
    }

    #[test]
    fn delta_unknown_user_errors() {
        let l = ledger();
        assert!(l.apply_delta("ghost", LedgerField::Score, 1).is_err());
    }

    #[test]
    fn unbounded_floor_goes_negative() {
        let l = ledger();
        l.apply_delta("u1", LedgerField::Score, -5).unwrap();
        assert_eq!(score(&l, "u1"), -5);
    }

    #[test]
    fn clamped_floor_stops_at_zero() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.create_user("u1", "alpha").unwrap();
        let l = Ledger::new(db, ScoreFloor::ClampAtZero);
        l.apply_delta("u1", LedgerField::Score, 3).unwrap();
        l.apply_delta("u1", LedgerField::Score, -10).unwrap();
        assert_eq!(score(&l, "u1"), 0);
    }

    #[test]
    fn absolute_write_overwrites_blindly() {
        let l = ledger();
        l.apply_delta("u1", LedgerField::Score, 10).unwrap();

        // The read-then-write form: a delta landing between read and
        // write is lost. This is why drift uses the CAS form instead.
        let observed = score(&l, "u1");
        l.apply_delta("u1", LedgerField::Score, 1).unwrap();
        l.apply_absolute("u1", LedgerField::Score, observed - 5).unwrap();
        assert_eq!(score(&l, "u1"), 5);
    }

    #[test]
    fn batch_is_all_or_nothing() {
        let l = ledger();
        l.apply_delta("u1", LedgerField::Score, 10).unwrap();

        let ops = vec![
            LedgerOp {
                user_id: "u1".into(),
                field: LedgerField::Score,
                delta: 1,
            },
            LedgerOp {
                user_id: "ghost".into(),
                field: LedgerField::Score,
                delta: -1,
            },
        ];
        assert!(l.batch(&ops).is_err());
        // The first op must not have leaked through.
        assert_eq!(score(&l, "u1"), 10);
    }

    #[test]
    fn vote_shaped_batch_commits_both() {
        let l = ledger();
        let ops = vec![
            LedgerOp {
                user_id: "u1".into(),
                field: LedgerField::Score,
                delta: 1,
            },
            LedgerOp {
                user_id: "u2".into(),
                field: LedgerField::Score,
                delta: -1,
            },
        ];
        l.batch(&ops).unwrap();
        assert_eq!(score(&l, "u1"), 1);
        assert_eq!(score(&l, "u2"), -1);
    }

    #[test]
    fn drift_cas_skips_on_stale_read() {
        let l = ledger();
        l.apply_delta("u1", LedgerField::Score, 100).unwrap();

        // Scheduler read 100, but a vote lands before the write-back.
        l.apply_delta("u1", LedgerField::Score, 1).unwrap();
        let applied = l
            .drift_score_cas("u1", 100, 95, 5, "2025-01-01 00:00:00")
            .unwrap();
        assert!(!applied);
        assert_eq!(score(&l, "u1"), 101);

        // Clean retry against the fresh value succeeds.
        let applied = l
            .drift_score_cas("u1", 101, 95, 6, "2025-01-01 00:00:00")
            .unwrap();
        assert!(applied);
        assert_eq!(score(&l, "u1"), 95);
    }

    #[test]
    fn settle_grant_is_replay_safe() {
        let l = ledger();
        assert!(l.settle_grant("evt_1", "u1", 100).unwrap());
        assert_eq!(coin(&l, "u1"), 100);

        // Provider retries the same event id.
        assert!(!l.settle_grant("evt_1", "u1", 100).unwrap());
        assert_eq!(coin(&l, "u1"), 100);

        // A distinct event settles normally.
        assert!(l.settle_grant("evt_2", "u1", 500).unwrap());
        assert_eq!(coin(&l, "u1"), 600);
    }

    #[test]
    fn analyze_post_applies_once() {
        let l = ledger();
        l.db.insert_post("p1", "u1", "look at this", 0, false).unwrap();

        let out = l.analyze_post("p1", 4, Some(25)).unwrap();
        assert_eq!(out, AnalyzeOutcome::Applied { rewarded: true });
        assert_eq!(coin(&l, "u1"), 25);

        let post = l.db.get_post("p1").unwrap().unwrap();
        assert_eq!(post.heat_score, 4);
        assert!(post.analyzed);

        // Re-delivery of the same finalize event: no rewrite, no re-grant.
        let out = l.analyze_post("p1", 4, Some(25)).unwrap();
        assert_eq!(out, AnalyzeOutcome::AlreadyAnalyzed);
        assert_eq!(coin(&l, "u1"), 25);
    }

    #[test]
    fn analyze_post_without_reward() {
        let l = ledger();
        l.db.insert_post("p2", "u2", "mild", 0, false).unwrap();
        let out = l.analyze_post("p2", 0, None).unwrap();
        assert_eq!(out, AnalyzeOutcome::Applied { rewarded: false });
        assert_eq!(coin(&l, "u2"), 0);
    }

    #[test]
    fn analyze_missing_post_is_not_found() {
        let l = ledger();
        assert_eq!(
            l.analyze_post("nope", 2, None).unwrap(),
            AnalyzeOutcome::NotFound
        );
    }
}

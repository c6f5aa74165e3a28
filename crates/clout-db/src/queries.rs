use crate::Database;
use crate::models::{PostRow, SubscriptionRow, SyndicateRow, UserRow, WhisperRow};
use anyhow::Result;

/// The two historically-named comment kinds. Functionally identical;
/// roasts survive only until the one-time migration has run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentKind {
    Whisper,
    Roast,
}

impl CommentKind {
    pub fn table(self) -> &'static str {
        match self {
            CommentKind::Whisper => "whispers",
            CommentKind::Roast => "roasts",
        }
    }
}

const USER_COLS: &str = "id, username, clout_score, clout_coin, photo_url, video_url, thumb_url, \
     top6, lat, lng, geohash, syndicate_id, last_active, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, id: &str, username: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username) VALUES (?1, ?2)",
                (id, username),
            )?;
            Ok(())
        })
    }

    pub fn get_user(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare(&format!("SELECT {USER_COLS} FROM users WHERE id = ?1"))?;
            let row = stmt.query_row([id], map_user).optional()?;
            Ok(row)
        })
    }

    /// Top users ordered by score descending. The candidate page for pair
    /// selection and the leaderboard both go through here.
    pub fn top_users(&self, limit: u32) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users ORDER BY clout_score DESC LIMIT ?1"
            ))?;
            let rows = stmt
                .query_map([limit], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Activity touch. The signup/profile paths that normally feed this
    /// live outside this server; votes and whispers deliberately do not
    /// touch it.
    pub fn set_last_active(&self, id: &str, ts: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE users SET last_active = ?1 WHERE id = ?2",
                (ts, id),
            )?;
            Ok(())
        })
    }

    /// Ids of every user inactive since before `cutoff` (flat decay
    /// eligibility). Indexed on last_active, so the scan is bounded by
    /// the eligible set, not the population.
    pub fn users_inactive_since(&self, cutoff: &str) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM users WHERE last_active < ?1")?;
            let ids = stmt
                .query_map([cutoff], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    /// (id, score) of every drift-eligible user: inactive since before
    /// `cutoff` and holding a positive score.
    pub fn users_for_drift(&self, cutoff: &str) -> Result<Vec<(String, i64)>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, clout_score FROM users
                 WHERE last_active < ?1 AND clout_score > 0",
            )?;
            let rows = stmt
                .query_map([cutoff], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn set_thumb_url(&self, user_id: &str, url: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE users SET thumb_url = ?1 WHERE id = ?2",
                (url, user_id),
            )?;
            Ok(n > 0)
        })
    }

    // -- Posts --

    pub fn insert_post(
        &self,
        id: &str,
        author_id: &str,
        caption: &str,
        heat_score: i64,
        analyzed: bool,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO posts (id, author_id, caption, heat_score, analyzed)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![id, author_id, caption, heat_score, analyzed],
            )?;
            Ok(())
        })
    }

    pub fn get_post(&self, id: &str) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, caption, heat_score, analyzed, created_at
                 FROM posts WHERE id = ?1",
            )?;
            let row = stmt.query_row([id], map_post).optional()?;
            Ok(row)
        })
    }

    /// Feed ordering: hottest first, newest breaking ties. Gossip posts
    /// carry a sentinel heat score so they sort above everything real.
    pub fn posts_by_heat(&self, limit: u32) -> Result<Vec<PostRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, author_id, caption, heat_score, analyzed, created_at
                 FROM posts ORDER BY heat_score DESC, created_at DESC LIMIT ?1",
            )?;
            let rows = stmt
                .query_map([limit], map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Comments --

    pub fn insert_comment(
        &self,
        kind: CommentKind,
        id: &str,
        user_id: &str,
        text: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO {} (id, user_id, text) VALUES (?1, ?2, ?3)",
                    kind.table()
                ),
                (id, user_id, text),
            )?;
            Ok(())
        })
    }

    pub fn whispers_for_user(&self, user_id: &str) -> Result<Vec<WhisperRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, text, created_at FROM whispers
                 WHERE user_id = ?1 ORDER BY created_at DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(WhisperRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        text: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// One-time move of every roast into whispers, one transaction for the
    /// whole move. Re-running after success is a no-op: the source is empty.
    pub fn migrate_roasts_to_whispers(&self) -> Result<usize> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            let moved = tx.execute(
                "INSERT INTO whispers (id, user_id, text, created_at)
                 SELECT id, user_id, text, created_at FROM roasts",
                [],
            )?;
            tx.execute("DELETE FROM roasts", [])?;
            tx.commit()?;
            Ok(moved)
        })
    }

    // -- Push subscriptions --

    /// Last registration wins: at most one live subscription per user.
    pub fn upsert_subscription(
        &self,
        user_id: &str,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT(user_id) DO UPDATE SET
                     endpoint = excluded.endpoint,
                     p256dh = excluded.p256dh,
                     auth = excluded.auth,
                     created_at = datetime('now')",
                (user_id, endpoint, p256dh, auth),
            )?;
            Ok(())
        })
    }

    pub fn get_subscription(&self, user_id: &str) -> Result<Option<SubscriptionRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT user_id, endpoint, p256dh, auth FROM push_subscriptions
                 WHERE user_id = ?1",
            )?;
            let row = stmt
                .query_row([user_id], |row| {
                    Ok(SubscriptionRow {
                        user_id: row.get(0)?,
                        endpoint: row.get(1)?,
                        p256dh: row.get(2)?,
                        auth: row.get(3)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn delete_subscription(&self, user_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "DELETE FROM push_subscriptions WHERE user_id = ?1",
                [user_id],
            )?;
            Ok(())
        })
    }

    // -- Syndicates --

    pub fn get_syndicate(&self, id: &str) -> Result<Option<SyndicateRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, tag, leader_id, treasury, created_at
                 FROM syndicates WHERE id = ?1",
            )?;
            let row = stmt
                .query_row([id], |row| {
                    Ok(SyndicateRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        tag: row.get(2)?,
                        leader_id: row.get(3)?,
                        treasury: row.get(4)?,
                        created_at: row.get(5)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }

    pub fn syndicate_members(&self, syndicate_id: &str) -> Result<Vec<UserRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {USER_COLS} FROM users
                 WHERE syndicate_id = ?1 ORDER BY clout_score DESC"
            ))?;
            let rows = stmt
                .query_map([syndicate_id], map_user)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        clout_score: row.get(2)?,
        clout_coin: row.get(3)?,
        photo_url: row.get(4)?,
        video_url: row.get(5)?,
        thumb_url: row.get(6)?,
        top6: row.get(7)?,
        lat: row.get(8)?,
        lng: row.get(9)?,
        geohash: row.get(10)?,
        syndicate_id: row.get(11)?,
        last_active: row.get(12)?,
        created_at: row.get(13)?,
    })
}

fn map_post(row: &rusqlite::Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        author_id: row.get(1)?,
        caption: row.get(2)?,
        heat_score: row.get(3)?,
        analyzed: row.get(4)?,
        created_at: row.get(5)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS syndicates (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL UNIQUE,
            tag         TEXT NOT NULL,
            leader_id   TEXT NOT NULL,
            treasury    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS users (
            id                 TEXT PRIMARY KEY,
            username           TEXT NOT NULL UNIQUE,
            clout_score        INTEGER NOT NULL DEFAULT 0,
            clout_coin         INTEGER NOT NULL DEFAULT 0,
            photo_url          TEXT,
            video_url          TEXT,
            thumb_url          TEXT,
            top6               TEXT,
            lat                REAL,
            lng                REAL,
            geohash            TEXT,
            syndicate_id       TEXT REFERENCES syndicates(id),
            last_active        TEXT NOT NULL DEFAULT (datetime('now')),
            last_drift_amount  INTEGER,
            last_drift_at      TEXT,
            created_at         TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_users_score
            ON users(clout_score DESC);

        CREATE INDEX IF NOT EXISTS idx_users_last_active
            ON users(last_active);

        -- author_id is deliberately unconstrained: gossip posts carry a
        -- synthetic author with no user row.
        CREATE TABLE IF NOT EXISTS posts (
            id          TEXT PRIMARY KEY,
            author_id   TEXT NOT NULL,
            caption     TEXT NOT NULL,
            heat_score  INTEGER NOT NULL DEFAULT 0,
            analyzed    INTEGER NOT NULL DEFAULT 0,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_posts_heat
            ON posts(heat_score DESC, created_at DESC);

        CREATE TABLE IF NOT EXISTS whispers (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_whispers_user
            ON whispers(user_id, created_at);

        -- Legacy comment kind, kept until the one-time migration has run
        -- everywhere. Identical shape to whispers.
        CREATE TABLE IF NOT EXISTS roasts (
            id          TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id),
            text        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_roasts_user
            ON roasts(user_id, created_at);

        CREATE TABLE IF NOT EXISTS push_subscriptions (
            user_id     TEXT PRIMARY KEY REFERENCES users(id),
            endpoint    TEXT NOT NULL,
            p256dh      TEXT NOT NULL,
            auth        TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        -- Settlement dedup ledger: one row per external event id ever
        -- applied. Checked-and-inserted in the same transaction as the
        -- grant it guards.
        CREATE TABLE IF NOT EXISTS processed_events (
            id            TEXT PRIMARY KEY,
            processed_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}

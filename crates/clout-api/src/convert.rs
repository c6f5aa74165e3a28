use chrono::{DateTime, Utc};
use tracing::warn;

use clout_db::models::{PostRow, SyndicateRow, UserRow, WhisperRow};
use clout_types::models::{GeoPoint, Post, Syndicate, UserProfile, Whisper};

/// Parse a stored timestamp. SQLite defaults write "YYYY-MM-DD HH:MM:SS"
/// without timezone; treat those as naive UTC.
pub fn parse_ts(raw: &str, context: &str) -> DateTime<Utc> {
    raw.parse::<DateTime<Utc>>()
        .or_else(|_| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            warn!("Corrupt timestamp '{}' on {}: {}", raw, context, e);
            DateTime::default()
        })
}

pub fn profile_from_row(row: UserRow) -> UserProfile {
    let top6 = match row.top6.as_deref() {
        None | Some("") => Vec::new(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Corrupt top6 '{}' on user '{}': {}", raw, row.id, e);
            Vec::new()
        }),
    };

    let location = match (row.lat, row.lng, row.geohash) {
        (Some(lat), Some(lng), Some(geohash)) => Some(GeoPoint { lat, lng, geohash }),
        _ => None,
    };

    UserProfile {
        last_active: parse_ts(&row.last_active, &format!("user '{}'", row.id)),
        created_at: parse_ts(&row.created_at, &format!("user '{}'", row.id)),
        id: row.id,
        username: row.username,
        clout_score: row.clout_score,
        clout_coin: row.clout_coin,
        photo_url: row.photo_url,
        video_url: row.video_url,
        thumb_url: row.thumb_url,
        top6,
        location,
        syndicate_id: row.syndicate_id,
    }
}

pub fn post_from_row(row: PostRow) -> Post {
    Post {
        created_at: parse_ts(&row.created_at, &format!("post '{}'", row.id)),
        id: row.id,
        author_id: row.author_id,
        caption: row.caption,
        heat_score: row.heat_score,
        analyzed: row.analyzed,
    }
}

pub fn whisper_from_row(row: WhisperRow) -> Whisper {
    Whisper {
        created_at: parse_ts(&row.created_at, &format!("whisper '{}'", row.id)),
        id: row.id,
        text: row.text,
    }
}

pub fn syndicate_from_row(row: SyndicateRow) -> Syndicate {
    Syndicate {
        created_at: parse_ts(&row.created_at, &format!("syndicate '{}'", row.id)),
        id: row.id,
        name: row.name,
        tag: row.tag,
        leader_id: row.leader_id,
        treasury: row.treasury,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sqlite_default_format() {
        let ts = parse_ts("2025-06-01 12:30:00", "test");
        assert_eq!(ts.to_rfc3339(), "2025-06-01T12:30:00+00:00");
    }

    #[test]
    fn corrupt_timestamp_falls_back() {
        let ts = parse_ts("garbage", "test");
        assert_eq!(ts, DateTime::<Utc>::default());
    }
}

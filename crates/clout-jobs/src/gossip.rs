use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};
use uuid::Uuid;

use clout_db::Database;
use clout_types::models::{GOSSIP_AUTHOR_ID, GOSSIP_HEAT_SENTINEL};

/// Candidate page for the gossip pair, same bound as the ranking arbiter.
pub const GOSSIP_PAGE: u32 = 20;

const CAPTIONS: &[&str] = &[
    "word on the street is {a} and {b} were seen comparing scores behind the dumpster.",
    "{a} says {b} peaked last season. The leaderboard remembers.",
    "sources confirm {a} and {b} are one vote away from a full meltdown.",
    "{a} and {b} were spotted at the top of the heap. Neither will admit it.",
];

/// Background task that periodically drops a synthetic gossip post about
/// two high scorers. Reads the ledger, never mutates it.
pub async fn run_gossip_loop(db: Arc<Database>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match generate_gossip(&db, &mut rand::rng()) {
            Ok(Some(post_id)) => info!("Gossip post {} published", post_id),
            Ok(None) => info!("Gossip skipped: not enough users to talk about"),
            Err(e) => warn!("Gossip run failed: {:#}", e),
        }
    }
}

/// One gossip round. Returns the new post id, or None when fewer than
/// two users exist.
pub fn generate_gossip<R: Rng>(db: &Database, rng: &mut R) -> anyhow::Result<Option<String>> {
    let users = db.top_users(GOSSIP_PAGE)?;
    if users.len() < 2 {
        return Ok(None);
    }

    // Rejection-sample two distinct subjects, same pattern as the
    // ranking arbiter's pair selection.
    let first = rng.random_range(0..users.len());
    let mut second = rng.random_range(0..users.len());
    while second == first {
        second = rng.random_range(0..users.len());
    }

    let template = CAPTIONS[rng.random_range(0..CAPTIONS.len())];
    let caption = template
        .replace("{a}", &users[first].username)
        .replace("{b}", &users[second].username);

    let post_id = Uuid::new_v4().to_string();
    // analyzed is set so the heat analyzer never reprocesses the post;
    // the sentinel heat pins it above all real content.
    db.insert_post(
        &post_id,
        GOSSIP_AUTHOR_ID,
        &caption,
        GOSSIP_HEAT_SENTINEL,
        true,
    )?;

    Ok(Some(post_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn setup() -> Arc<Database> {
        Arc::new(Database::open_in_memory().unwrap())
    }

    #[test]
    fn gossip_references_two_distinct_users() {
        let db = setup();
        db.create_user("a", "alpha").unwrap();
        db.create_user("b", "bravo").unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        let post_id = generate_gossip(&db, &mut rng).unwrap().unwrap();

        let post = db.get_post(&post_id).unwrap().unwrap();
        assert_eq!(post.author_id, GOSSIP_AUTHOR_ID);
        assert_eq!(post.heat_score, GOSSIP_HEAT_SENTINEL);
        assert!(post.analyzed);
        assert!(post.caption.contains("alpha"));
        assert!(post.caption.contains("bravo"));
    }

    #[test]
    fn gossip_needs_two_users() {
        let db = setup();
        db.create_user("a", "alpha").unwrap();

        let mut rng = StdRng::seed_from_u64(3);
        assert!(generate_gossip(&db, &mut rng).unwrap().is_none());
    }

    #[test]
    fn gossip_with_empty_population_is_a_noop() {
        let db = setup();
        let mut rng = StdRng::seed_from_u64(3);
        assert!(generate_gossip(&db, &mut rng).unwrap().is_none());
    }
}

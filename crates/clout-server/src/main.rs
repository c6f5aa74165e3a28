use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use clout_api::middleware::require_auth;
use clout_api::{
    AppState, AppStateInner, heat, leaderboard, migrate, payments, rank, subscriptions,
    syndicates, whispers,
};
use clout_db::ledger::{Ledger, ScoreFloor};
use clout_gateway::checkout::CheckoutClient;
use clout_gateway::classifier::HttpSafeSearchClassifier;
use clout_gateway::push::HttpPushClient;
use clout_jobs::decay::{self, DecayPolicy};
use clout_jobs::gossip;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clout=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("CLOUT_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("CLOUT_DB_PATH").unwrap_or_else(|_| "clout.db".into());
    let host = std::env::var("CLOUT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("CLOUT_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    let score_floor = match std::env::var("CLOUT_SCORE_FLOOR").as_deref() {
        Ok("zero") => ScoreFloor::ClampAtZero,
        _ => ScoreFloor::Unbounded,
    };
    let decay_policy = match std::env::var("CLOUT_DECAY_POLICY").as_deref() {
        Ok("drift") => DecayPolicy::Drift,
        _ => DecayPolicy::Flat,
    };
    let decay_interval_hours: u64 = std::env::var("CLOUT_DECAY_INTERVAL_HOURS")
        .unwrap_or_else(|_| "24".into())
        .parse()?;
    let gossip_interval_mins: u64 = std::env::var("CLOUT_GOSSIP_INTERVAL_MINS")
        .unwrap_or_else(|_| "60".into())
        .parse()?;

    // Init database
    let db = Arc::new(clout_db::Database::open(&PathBuf::from(&db_path))?);
    let ledger = Ledger::new(db.clone(), score_floor);

    // External providers
    let push_server_key = std::env::var("PUSH_SERVER_KEY").unwrap_or_default();
    if push_server_key.is_empty() {
        warn!("PUSH_SERVER_KEY unset; push deliveries will be rejected by the provider");
    }
    let push = Arc::new(HttpPushClient::new(push_server_key));

    let vision_endpoint = std::env::var("VISION_API_ENDPOINT")
        .unwrap_or_else(|_| "https://vision.googleapis.com".into());
    let vision_key = std::env::var("VISION_API_KEY").unwrap_or_default();
    let classifier = Arc::new(HttpSafeSearchClassifier::new(vision_endpoint, vision_key));

    let checkout = match std::env::var("CHECKOUT_SECRET_KEY") {
        Ok(key) if !key.is_empty() => {
            let api_base = std::env::var("CHECKOUT_API_BASE")
                .unwrap_or_else(|_| "https://api.stripe.com".into());
            Some(CheckoutClient::new(api_base, key))
        }
        _ => {
            warn!("CHECKOUT_SECRET_KEY unset; checkout session creation disabled");
            None
        }
    };
    let webhook_secret = std::env::var("CHECKOUT_WEBHOOK_SECRET")
        .ok()
        .filter(|s| !s.is_empty());
    if webhook_secret.is_none() {
        warn!("CHECKOUT_WEBHOOK_SECRET unset; settlement webhook disabled");
    }

    // Shared state
    let app_state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        ledger: ledger.clone(),
        push,
        classifier,
        checkout,
        webhook_secret,
        jwt_secret,
    });

    // Background jobs
    tokio::spawn(decay::run_decay_loop(
        db.clone(),
        ledger.clone(),
        decay_policy,
        Duration::from_secs(decay_interval_hours * 60 * 60),
    ));
    tokio::spawn(gossip::run_gossip_loop(
        db.clone(),
        Duration::from_secs(gossip_interval_mins * 60),
    ));

    // Routes
    let public_routes = Router::new()
        .route("/rank", get(rank::load_pair))
        .route("/rank/vote", post(rank::vote))
        .route("/leaderboard", get(leaderboard::get_leaderboard))
        .route("/feed", get(leaderboard::get_feed))
        .route("/users/{uid}", get(whispers::get_profile))
        .route("/users/{uid}/whispers", post(whispers::post_whisper))
        .route("/users/{uid}/roasts", post(whispers::post_roast))
        .route("/syndicates/{id}", get(syndicates::get_syndicate))
        .route("/triggers/storage", post(heat::storage_event))
        .route("/payments/webhook", post(payments::webhook))
        .with_state(app_state.clone());

    let protected_routes = Router::new()
        .route("/payments/checkout-session", post(payments::create_checkout))
        .route("/push/subscriptions", post(subscriptions::subscribe))
        .route("/admin/migrate-roasts", post(migrate::migrate_roasts))
        .layer(middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ))
        .with_state(app_state);

    let app = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Clout server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

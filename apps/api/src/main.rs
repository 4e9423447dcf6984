mod cache;
mod config;
mod db;
mod errors;
mod models;
mod resume;
mod routes;
mod saved;
mod search;
mod state;
#[cfg(test)]
mod testing;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::cache::{RedisTagCache, TagCache};
use crate::config::Config;
use crate::db::create_pool;
use crate::resume::session::{DraftRegistry, SessionTimings};
use crate::resume::store::{PgResumeStore, S3PhotoStorage};
use crate::routes::build_router;
use crate::saved::store::{CachedSavedJobStore, PgSavedJobStore};
use crate::search::source::{CachedListingSource, PgListingSource};
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job board API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config).await?;

    // Initialize Redis
    let redis = redis::Client::open(config.redis_url.clone())?;
    let cache: Arc<dyn TagCache> = Arc::new(RedisTagCache::new(redis));
    info!("Redis client initialized");

    // Initialize S3 / MinIO for resume photos
    let s3 = build_s3_client(&config).await;
    let photos = Arc::new(S3PhotoStorage::new(
        s3,
        config.s3_bucket.clone(),
        &config.s3_endpoint,
    ));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let listings = CachedListingSource::new(
        Arc::new(PgListingSource::new(db.clone())),
        cache.clone(),
        config.listing_cache_ttl,
    );
    let saved_jobs = CachedSavedJobStore::new(
        Arc::new(PgSavedJobStore::new(db.clone())),
        cache,
        config.listing_cache_ttl,
    );

    let state = AppState {
        resumes: Arc::new(PgResumeStore::new(db, photos)),
        listings: Arc::new(listings),
        saved_jobs: Arc::new(saved_jobs),
        drafts: DraftRegistry::default(),
        draft_timings: SessionTimings {
            debounce: config.autosave_debounce,
            idle_timeout: config.draft_idle_timeout,
        },
    };
    info!(
        "Autosave debounce {}ms, draft idle timeout {}s, listing cache TTL {}s",
        config.autosave_debounce.as_millis(),
        config.draft_idle_timeout.as_secs(),
        config.listing_cache_ttl.as_secs()
    );

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins to the web app's domain

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "jobboard-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}

use std::net::SocketAddr;
use std::sync::Arc;

use lead_qualifier::config::Config;
use lead_qualifier::data::db::Database;
use lead_qualifier::data::db_storage::PgStorage;
use lead_qualifier::data::memory_storage::InMemoryStorage;
use lead_qualifier::data::storage::Storage;
use lead_qualifier::handlers::{self, AppState};
use lead_qualifier::obs;
use lead_qualifier::scoring::ScoringEngine;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};

/// Main entry point for the application.
///
/// Initializes tracing, configuration, storage (Postgres when `DATABASE_URL` is set,
/// in-memory otherwise) and the scoring engine, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    obs::init_tracing();

    let config = Config::from_env()?;

    let storage: Arc<dyn Storage> = match config.database_url.as_deref() {
        Some(url) => {
            let db = Database::new(url).await?;
            tracing::info!("Database connection pool established");
            Arc::new(PgStorage::new(db.pool))
        }
        None => {
            tracing::info!("In-memory storage initialized");
            Arc::new(InMemoryStorage::new())
        }
    };

    let engine = ScoringEngine::from_config(&config, storage.clone())?;
    let app_state = Arc::new(AppState::new(config.clone(), storage, engine));

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    // Health and status bypass rate limiting
    let api = handlers::api_routes().layer(GovernorLayer {
        config: governor_conf,
    });
    let app = handlers::app(app_state, api);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

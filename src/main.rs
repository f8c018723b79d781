use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use figflix_api::{
    config::{Config, StorageBackend},
    db::{create_pool, run_migrations, MemoryRepository, PgRepository, Repository},
    routes::{create_router, AppState},
    services::{auth::TokenService, catalog::tmdb::TmdbCatalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("figflix_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let repo: Arc<dyn Repository> = match config.storage()? {
        StorageBackend::Postgres => {
            let pool = create_pool(&config.database_url)
                .await
                .context("Failed to connect to database")?;
            run_migrations(&pool).await?;
            tracing::info!("Using PostgreSQL repository");
            Arc::new(PgRepository::new(pool))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory repository; data is lost on shutdown");
            Arc::new(MemoryRepository::new())
        }
    };

    let catalog = TmdbCatalog::from_config(&config)?;
    if config.tmdb_api_key.is_none() {
        tracing::warn!("TMDB_API_KEY not set; catalog endpoints will return empty results");
    }

    let tokens = TokenService::new(
        &config.jwt_secret,
        chrono::Duration::minutes(config.access_token_ttl_minutes),
        chrono::Duration::days(config.refresh_token_ttl_days),
    );

    let state = Arc::new(AppState::new(repo, Arc::new(catalog), tokens));
    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;

    tracing::info!(address = %address, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use omoi_api::{
    api::{AppState, JwtVerifier},
    config::Config,
    create_router,
    db::{create_pool, run_migrations, PgStore},
    services::{JikanProvider, SearchThrottle},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("omoi_api=info,tower_http=info")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    let pool = create_pool(&config.database_url, config.database_max_connections).await?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(JikanProvider::new(config.jikan_api_url.clone())),
        Arc::new(SearchThrottle::new(config.search_min_interval())),
        config.metadata_ttl(),
        JwtVerifier::new(&config.jwt_secret),
    );

    let app = create_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!(address = %address, "Server listening");

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

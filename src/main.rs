use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use cinewise::api::{create_router, AppState};
use cinewise::config::Config;
use cinewise::services::providers::{tmdb::TmdbProvider, CatalogProvider};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let provider: Arc<dyn CatalogProvider> = Arc::new(TmdbProvider::new(
        config.tmdb_api_key.clone(),
        config.tmdb_api_url.clone(),
    ));

    let state = AppState::new(provider, config.recommendation_count);
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}

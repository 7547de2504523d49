mod config;
mod errors;
mod geocoding;
mod models;
mod poem_client;
mod render;
mod routes;
mod session;
mod state;
mod store;
#[cfg(test)]
mod testing;
mod upstream;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::geocoding::NominatimGeocoder;
use crate::poem_client::HuggingFaceClient;
use crate::routes::build_router;
use crate::session::SessionRegistry;
use crate::state::AppState;
use crate::store::github::GithubContents;
use crate::upstream::build_http_client;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MyContacts v{}", env!("CARGO_PKG_VERSION"));

    let http = build_http_client(Duration::from_secs(config.http_timeout_secs))
        .context("Failed to build HTTP client")?;
    info!("Outbound HTTP timeout: {}s", config.http_timeout_secs);

    // Remote table store, one handle for the whole process
    let store = GithubContents::new(
        http.clone(),
        config.github_api_url.clone(),
        config.github_owner.clone(),
        config.github_repo.clone(),
        config.github_token.clone(),
    );
    info!(
        "Table store: {}/{} ({})",
        config.github_owner, config.github_repo, config.data_file
    );

    let geocoder = NominatimGeocoder::new(http.clone(), config.nominatim_url.clone());
    let poems = HuggingFaceClient::new(
        http,
        config.huggingface_url.clone(),
        config.huggingface_token.clone(),
    );
    info!("Poem client initialized (model: {})", poem_client::MODEL);

    let state = AppState {
        store: Arc::new(store),
        geocoder: Arc::new(geocoder),
        poems: Arc::new(poems),
        sessions: Arc::new(SessionRegistry::new(
            config.data_file.clone(),
            Duration::from_secs(config.session_idle_ttl_secs),
        )),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

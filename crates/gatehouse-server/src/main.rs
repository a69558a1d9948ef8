use std::sync::Arc;

use gatehouse_server::{app, logging, AppState, ServerConfig};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    logging::init(&config.log_level);

    tracing::info!(
        providers = config.providers.len(),
        email_policy = config.email_policy.as_str(),
        "Starting Gatehouse"
    );
    if config.providers.is_empty() {
        tracing::warn!("No login providers configured");
    }

    let state = Arc::new(AppState::from_config(&config)?);
    let router = app(state);

    let addr = config.bind_addr();
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, router).await?;

    Ok(())
}

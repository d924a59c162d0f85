//! ams-proxy: forwards chat, upload and file requests to the agent backends.
//!
//! Configuration comes from the environment: `LISTEN_ADDR`,
//! `LLM_API_BASE_URL`, `API_BASE_URL`, `CORS_ORIGINS`, `MAX_BODY_BYTES`,
//! `REQUEST_TIMEOUT_SECONDS`.

use ams_proxy::{ProxyConfig, ProxyState, create_router};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,ams_proxy=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ProxyConfig::from_env()?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        llm_api_base_url = %config.llm_api_base_url,
        api_base_url = %config.api_base_url,
        "Proxy configuration loaded"
    );

    let listen_addr = config.listen_addr.clone();
    let app = create_router(ProxyState::new(config));

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

use anyhow::Context;
use portal_gate::{app, config::AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up PORTAL_JWT_SECRET, PORTAL_USERS_FILE, etc.
    let _ = dotenvy::dotenv();

    portal_gate::init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;
    tracing::info!("Starting Portal Gate in {:?} mode", config.environment);

    let state = AppState::from_config(&config).context("failed to initialize session services")?;
    let app = app(state, &config.security);

    let bind_addr = format!("0.0.0.0:{}", config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Portal Gate listening on http://{}", bind_addr);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}

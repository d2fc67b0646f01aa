mod app;
mod auth;
mod config;
mod db;
mod error;
mod listings;
mod rate_limit;
mod state;
#[cfg(test)]
mod testing;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "marketplace=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = state::AppState::init().await?;
    let addr = app_state.config.socket_addr()?;
    tracing::info!(
        environment = ?app_state.config.environment,
        "configuration loaded"
    );

    let app = app::build_app(app_state)?;
    app::serve(app, addr).await
}

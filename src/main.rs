use landreg::app;
use landreg::config::{AppConfig, Environment};
use landreg::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "landreg=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(config.environment == Environment::Production);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let state = AppState::new(config)?;
    let app = app::build_app(state);
    app::serve(app).await
}

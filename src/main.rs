mod app;
mod auth;
mod config;
mod error;
mod mail;
mod referrals;
mod state;
mod store;

use tracing_subscriber::EnvFilter;

use config::{LogConfig, LogFormat};

fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::new(&log.filter);
    match log.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(&LogConfig::from_env());

    let state = state::AppState::init().await?;
    tracing::info!(
        store = ?state.config.store,
        mail = ?state.config.mail,
        addr = %state.config.listen_addr,
        "waitlist backend starting"
    );

    let addr = state.config.listen_addr;
    app::serve(app::build_app(state), addr).await
}

use fitcheck::{
    routes,
    setup::{run_server, setup_sentry, setup_tracing},
    state::{AppConfig, AppState},
};
use tracing::info;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    // Initialize Sentry for error tracking
    let _sentry_guard = setup_sentry();

    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()?
        .block_on(async { run_application().await })
}

async fn run_application() -> color_eyre::Result<()> {
    setup_tracing("fitcheck")?;

    let config = AppConfig::from_env()?;
    let app_state = AppState::from_config(&config).await?;

    info!(version = app_state.version(), port = config.port, "Starting fitcheck");
    run_server(routes::routes(app_state), config.port).await
}

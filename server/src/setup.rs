//! Process-level setup: error tracking, tracing and the HTTP listener.

use std::net::SocketAddr;

use color_eyre::eyre::WrapErr;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_tree::HierarchicalLayer;

/// Start Sentry when `SENTRY_DSN` is set. Keep the guard alive for the life of the process.
pub fn setup_sentry() -> Option<sentry::ClientInitGuard> {
    let dsn = std::env::var("SENTRY_DSN").ok()?;

    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            traces_sample_rate: 1.0,
            ..Default::default()
        },
    )))
}

/// Install the global subscriber, filtered by `RUST_LOG` (default `info`)
pub fn setup_tracing(crate_name: &str) -> color_eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("info,{crate_name}=debug")))
        .wrap_err("Invalid RUST_LOG filter")?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            HierarchicalLayer::new(2)
                .with_targets(true)
                .with_bracketed_fields(true),
        )
        .try_init()
        .wrap_err("Failed to install tracing subscriber")?;

    Ok(())
}

/// Serve `router` on all interfaces until the process is stopped
pub async fn run_server(router: axum::Router, port: u16) -> color_eyre::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .wrap_err_with(|| format!("Failed to bind {addr}"))?;

    info!(%addr, "Listening");
    axum::serve(listener, router)
        .await
        .wrap_err("Server exited with an error")?;

    Ok(())
}

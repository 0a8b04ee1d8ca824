pub mod error;
pub mod http;
pub mod kv;
pub mod state;
pub mod telemetry;

use std::net::SocketAddr;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub use kv::MemoryKv;
pub use state::AppState;
pub use telemetry::CorrelationId;

#[derive(Clone, Debug)]
pub struct DemoRuntimeConfig {
    pub http_addr: SocketAddr,
}

pub async fn run(config: DemoRuntimeConfig, state: AppState) -> anyhow::Result<()> {
    let listener = TcpListener::bind(config.http_addr).await.with_context(|| {
        format!(
            "failed to bind http listener on {addr}",
            addr = config.http_addr
        )
    })?;

    let http_addr = listener.local_addr()?;
    info!(%http_addr, strategy = state.context.config().strategy.as_str(), "http server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(anyhow::Error::from)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(?err, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => warn!(?err, "failed to install sigterm handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

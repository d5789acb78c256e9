//! Listener setup and graceful shutdown.

use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;

use crate::config::ProxyConfig;
use crate::error::Result;
use crate::routes::{ProxyState, router};

/// Binds `config.bind` and serves until Ctrl+C or SIGTERM.
pub async fn serve(config: ProxyConfig) -> Result<()> {
    let state = Arc::new(ProxyState::new(&config)?);
    let listener = TcpListener::bind(&config.bind).await?;
    tracing::info!(
        bind = %listener.local_addr()?,
        upstream = %config.upstream,
        ttl_secs = config.cache_ttl_secs,
        "Proxy listening"
    );
    run(listener, state, shutdown_signal()).await
}

/// Serves on an already bound listener until `shutdown` completes.
pub async fn run<F>(listener: TcpListener, state: Arc<ProxyState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("Proxy stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                tracing::warn!(error = %err, "Cannot listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                tracing::info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                tracing::warn!(error = %err, "Cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

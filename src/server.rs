//! Service bootstrap: bind the listener and serve until shutdown.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use json_relay::{server, Relay, ServiceConfig};
//!
//! let config = Arc::new(ServiceConfig::load(&cli)?);
//! let relay = Arc::new(Relay::from_config(&config)?);
//! server::serve(config, relay).await?;
//! ```

use std::future::Future;
use std::io;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::config::ServiceConfig;
use crate::ingest;
use crate::relay::Relay;

/// Bind to the configured address and serve until Ctrl-C.
pub async fn serve(config: Arc<ServiceConfig>, relay: Arc<Relay>) -> io::Result<()> {
    let listener = TcpListener::bind(config.bind_addr()).await?;
    serve_with_shutdown(listener, config, relay, shutdown_signal()).await
}

/// Serve on an already-bound listener until `shutdown` resolves.
///
/// Each connection runs on its own task; all of them share `config` and the
/// single `relay`.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    config: Arc<ServiceConfig>,
    relay: Arc<Relay>,
    shutdown: F,
) -> io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(
        %addr,
        provider = relay.provider_name(),
        allow_to_override = config.allow_to_override,
        max_body_bytes = config.max_body_bytes,
        "Listening on http://{addr}/ingest"
    );

    let app = ingest::router(config, relay);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for shutdown signal"),
    }
}

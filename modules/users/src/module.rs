use std::future::Future;

use anyhow::Context;
use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::api::rest;
use crate::api::routes::RouteTable;
use crate::config::UsersConfig;
use crate::domain::repo::UserStore;
use crate::domain::service::UserService;

/// Users module: wires a connected store into the service and its routes.
#[derive(Clone)]
pub struct UsersModule {
    config: UsersConfig,
    table: RouteTable,
}

impl UsersModule {
    #[must_use]
    pub fn new(store: UserStore, config: UsersConfig) -> Self {
        let service = UserService::new(store, config.store_timeout());
        Self {
            table: RouteTable::users(service),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &UsersConfig {
        &self.config
    }

    /// The transport-neutral table, for the gateway-event binder.
    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        &self.table
    }

    #[must_use]
    pub fn router(&self) -> Router {
        rest::router(self.table.clone(), self.config.max_body_size_bytes)
    }
}

/// Serve `module` on `listener` until Ctrl-C or SIGTERM.
///
/// # Errors
/// Returns an error if the listener address cannot be read or the server fails.
pub async fn serve(listener: TcpListener, module: UsersModule) -> anyhow::Result<()> {
    serve_with_shutdown(listener, module, shutdown_signal()).await
}

/// Serve `module` on `listener` until `shutdown` resolves.
///
/// # Errors
/// Returns an error if the listener address cannot be read or the server fails.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    module: UsersModule,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    for (method, path) in module.routes().endpoints() {
        info!("{path}/{method}");
    }
    info!("Started service at: http://{addr}");

    axum::serve(listener, module.router())
        .with_graceful_shutdown(shutdown)
        .await
        .context("HTTP server exited unexpectedly")
}

/// Resolves on Ctrl-C or SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut terminate) => {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if let Err(err) = result {
                            warn!("failed waiting for Ctrl+C signal: {err}");
                        }
                    }
                    _ = terminate.recv() => {}
                }
            }
            Err(err) => {
                warn!("failed to register SIGTERM handler: {err}");
                if let Err(err) = tokio::signal::ctrl_c().await {
                    warn!("failed waiting for Ctrl+C signal: {err}");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!("failed waiting for Ctrl+C signal: {err}");
        }
    }

    info!("Shutdown signal received");
}

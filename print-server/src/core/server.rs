//! Server Implementation
//!
//! Binds the HTTP API, starts the background tasks and waits for a shutdown
//! signal.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::tasks::{BackgroundTasks, TaskKind};
use super::{Config, Result, ServerState};
use crate::orders::OrderSource;
use crate::printing::Dispatcher;

/// How often the retention sweeper runs
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// HTTP Server
pub struct Server {
    config: Config,
    state: ServerState,
}

impl Server {
    pub fn new(config: Config, state: ServerState) -> Self {
        Self { config, state }
    }

    pub async fn run(&self) -> Result<()> {
        let shutdown = CancellationToken::new();
        let mut tasks = BackgroundTasks::with_token(shutdown.clone());

        self.start_background_tasks(&mut tasks)?;
        tasks.log_summary();

        let app = crate::api::build_app(self.state.clone());

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let listener = tokio::net::TcpListener::bind(addr).await?;
        tracing::info!("Print server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
            .await?;

        tasks.shutdown().await;
        Ok(())
    }

    fn start_background_tasks(&self, tasks: &mut BackgroundTasks) -> Result<()> {
        let token = tasks.shutdown_token();

        match &self.state.ledger {
            Some(ledger) => {
                let source: Arc<dyn OrderSource> = match &self.state.feed {
                    Some(feed) => {
                        tracing::info!(feed = %feed.orders_url(), "Dispatching from remote feed");
                        Arc::new(feed.clone())
                    }
                    None => Arc::new(self.state.store.clone()),
                };

                let dispatcher = Arc::new(Dispatcher::new(
                    self.state.printer.clone(),
                    source,
                    ledger.clone(),
                    self.state.renderer(),
                ));
                tasks.spawn(
                    "dispatcher",
                    TaskKind::Worker,
                    dispatcher.run(self.config.poll_interval(), token),
                );
            }
            None => tracing::info!("Dispatcher disabled on this instance"),
        }

        let store = self.state.store.clone();
        tasks.spawn_periodic("retention_sweeper", SWEEP_INTERVAL, move || {
            if let Err(e) = store.sweep_expired() {
                tracing::error!(error = %e, "Retention sweep failed");
            }
        });
        Ok(())
    }
}

/// Resolve on Ctrl-C, SIGTERM or external cancellation, cancelling `token`
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
        _ = token.cancelled() => {}
    }

    tracing::info!("Shutting down...");
    token.cancel();
}

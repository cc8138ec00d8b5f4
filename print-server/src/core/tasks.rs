//! Background task registry
//!
//! The dispatcher and the retention sweeper live here so that shutdown cancels
//! and joins them in one place. A panic in one task is logged and never takes
//! the HTTP server down with it.

use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// How long `shutdown` waits for a task before aborting it
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Owns its own loop and runs until the token is cancelled
    Worker,
    /// Closure driven by [`BackgroundTasks::spawn_periodic`]
    Periodic,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TaskKind::Worker => "worker",
            TaskKind::Periodic => "periodic",
        })
    }
}

struct Entry {
    name: &'static str,
    kind: TaskKind,
    handle: JoinHandle<()>,
}

pub struct BackgroundTasks {
    entries: Vec<Entry>,
    token: CancellationToken,
}

impl BackgroundTasks {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    /// Share a token with something else that may trigger shutdown
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            entries: Vec::new(),
            token,
        }
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Start a task that watches the shutdown token itself
    pub fn spawn<F>(&mut self, name: &'static str, kind: TaskKind, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let token = self.token.clone();
        let handle = tokio::spawn(async move {
            match AssertUnwindSafe(future).catch_unwind().await {
                Ok(()) if token.is_cancelled() => {
                    tracing::debug!(task = name, "Task stopped");
                }
                Ok(()) => {
                    tracing::warn!(task = name, %kind, "Task exited before shutdown");
                }
                Err(panic) => {
                    tracing::error!(
                        task = name,
                        %kind,
                        panic = panic_message(panic.as_ref()),
                        "Task panicked"
                    );
                }
            }
        });

        tracing::debug!(task = name, %kind, "Task started");
        self.entries.push(Entry { name, kind, handle });
    }

    /// Run `job` every `every` until shutdown
    ///
    /// The first run happens one full interval after start. A run that panics
    /// ends the task.
    pub fn spawn_periodic<J>(&mut self, name: &'static str, every: Duration, mut job: J)
    where
        J: FnMut() + Send + 'static,
    {
        let token = self.token.clone();
        self.spawn(name, TaskKind::Periodic, async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => job(),
                }
            }
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn log_summary(&self) {
        let names: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}({})", e.name, e.kind))
            .collect();
        tracing::info!(count = self.entries.len(), tasks = %names.join(", "), "Background tasks running");
    }

    /// Cancel the token and join every task, aborting stragglers after a grace period
    pub async fn shutdown(self) {
        self.token.cancel();

        for mut entry in self.entries {
            match tokio::time::timeout(SHUTDOWN_GRACE, &mut entry.handle).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::error!(task = entry.name, error = %e, "Task join failed"),
                Err(_) => {
                    tracing::warn!(task = entry.name, "Task ignored shutdown, aborting");
                    entry.handle.abort();
                }
            }
        }

        tracing::info!("Background tasks stopped");
    }
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    panic
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| panic.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

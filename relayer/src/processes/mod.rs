//! Long-running processes and their supervisor.
//!
//! The supervisor runs named processes concurrently after a strictly serial
//! initialization phase: every process must `init` successfully before any
//! is spawned, so a bad configuration aborts the whole relayer instead of
//! leaving half of it running. Panics are caught at the spawn boundary and
//! handled like errors. A restartable process is re-entered after logging;
//! a non-restartable failure cancels the entire group.

pub mod ingest;
pub mod submitter;

use std::sync::Arc;

use async_trait::async_trait;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::error::RelayerError;

/// A unit of supervised work.
#[async_trait]
pub trait RunnableProcess: Send + Sync + 'static {
    /// Serial pre-spawn initialization. Defaults to a no-op.
    async fn init(&mut self) -> Result<(), RelayerError> {
        Ok(())
    }

    /// The process body. Must watch `shutdown` at every suspension point
    /// and return [`RelayerError::Cancelled`] once it fires.
    async fn run(self: Arc<Self>, shutdown: CancellationToken) -> Result<(), RelayerError>;
}

pub struct ProcessSpec {
    name: String,
    restart_on_error: bool,
    process: Box<dyn RunnableProcess>,
}

impl ProcessSpec {
    pub fn new(name: impl Into<String>, process: impl RunnableProcess) -> Self {
        Self {
            name: name.into(),
            restart_on_error: false,
            process: Box::new(process),
        }
    }

    /// Restart the process after an error instead of failing the group.
    pub fn restartable(mut self) -> Self {
        self.restart_on_error = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

pub struct Supervisor {
    specs: Vec<ProcessSpec>,
}

impl Supervisor {
    pub fn new(specs: Vec<ProcessSpec>) -> Self {
        Self { specs }
    }

    /// Initialize every process serially, then run them all until they
    /// finish or the group fails.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), RelayerError> {
        let mut initialized = Vec::with_capacity(self.specs.len());
        for mut spec in self.specs {
            spec.process.init().await?;
            initialized.push(spec);
        }

        let mut tasks = JoinSet::new();
        for spec in initialized {
            let token = shutdown.clone();
            tasks.spawn(supervise(
                spec.name,
                spec.restart_on_error,
                Arc::from(spec.process),
                token,
            ));
        }

        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            let failed = match joined {
                Ok(Ok(())) => None,
                Ok(Err(err)) => Some(err),
                Err(join_err) => Some(RelayerError::Panicked {
                    process: "supervisor".to_owned(),
                    message: join_err.to_string(),
                }),
            };
            if let Some(err) = failed {
                shutdown.cancel();
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

async fn supervise(
    name: String,
    restart_on_error: bool,
    process: Arc<dyn RunnableProcess>,
    shutdown: CancellationToken,
) -> Result<(), RelayerError> {
    loop {
        let handle = tokio::spawn(Arc::clone(&process).run(shutdown.clone()));
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(join_err) if join_err.is_panic() => Err(RelayerError::Panicked {
                process: name.clone(),
                message: panic_message(join_err.into_panic()),
            }),
            Err(_) => Err(RelayerError::Cancelled),
        };

        match outcome {
            Ok(()) => {
                info!(process = %name, "process finished");
                return Ok(());
            }
            Err(err) if err.is_cancellation() || shutdown.is_cancelled() => {
                debug!(process = %name, "process cancelled");
                return Ok(());
            }
            Err(err) => {
                error!(process = %name, %err, "process failed");
                if restart_on_error {
                    continue;
                }
                shutdown.cancel();
                return Err(err);
            }
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

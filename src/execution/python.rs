//! Run an uploaded Python file after reconciling its imports.

use std::{path::Path, time::Duration};

use tracing::{info, warn};

use super::ExecutionOutcome;
use crate::{
    process::{self, python, CommandOutcome},
    reconcile::Reconciler,
};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct ScriptRunner {
    reconciler: Reconciler,
    interpreter: String,
    timeout: Duration,
}

impl ScriptRunner {
    pub fn new(reconciler: Reconciler, interpreter: impl Into<String>) -> Self {
        Self {
            reconciler,
            interpreter: interpreter.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reconcile dependencies, then run `path` with the configured deadline.
    ///
    /// The file is left in place; deleting it is up to the caller.
    pub async fn execute_file(&self, path: &Path) -> ExecutionOutcome {
        match self.reconciler.reconcile(path).await {
            Ok(done) => info!("{}: {}", path.display(), done.message()),
            Err(e) => {
                warn!("not running {}: {}", path.display(), e);
                return ExecutionOutcome::failure(e.to_string());
            }
        }

        // The child runs from the file's directory, so hand it an absolute path.
        let script = match std::fs::canonicalize(path) {
            Ok(p) => p,
            Err(e) => return ExecutionOutcome::failure(format!("cannot open {}: {}", path.display(), e)),
        };

        info!("running {}", script.display());
        let cmd = python::script(&self.interpreter, &script);
        match process::run_with_timeout(cmd, self.timeout).await {
            Ok(CommandOutcome::Exited(out)) => {
                info!("{} exited with {:?}", script.display(), out.exit_code);
                ExecutionOutcome {
                    success: out.success(),
                    exit_code: out.exit_code,
                    stdout: out.stdout,
                    stderr: out.stderr,
                    timed_out: false,
                }
            }
            Ok(CommandOutcome::TimedOut) => {
                warn!("{} timed out", script.display());
                ExecutionOutcome {
                    timed_out: true,
                    ..ExecutionOutcome::failure(format!(
                        "timeout after {} seconds",
                        self.timeout.as_secs()
                    ))
                }
            }
            Err(e) => ExecutionOutcome::failure(format!("failed to start {}: {}", self.interpreter, e)),
        }
    }
}

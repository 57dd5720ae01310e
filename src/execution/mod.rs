//! Script execution: result type and the Python runner.

pub mod python;

pub use python::ScriptRunner;

/// What one script run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionOutcome {
    /// True iff the interpreter exited with status zero.
    pub success: bool,
    pub stdout: String,
    /// Process stderr, or the reason the script never ran or was stopped.
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

impl ExecutionOutcome {
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            stderr: reason.into(),
            ..Self::default()
        }
    }
}

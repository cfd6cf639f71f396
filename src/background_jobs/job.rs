use super::context::JobContext;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during job execution.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("Job was cancelled")]
    Cancelled,
}

/// A named periodic unit of work.
///
/// Jobs are executed synchronously in a blocking context. Long-running
/// work should check `ctx.is_cancelled()` periodically and return
/// `JobError::Cancelled` when shutdown is requested. A job failing (or
/// panicking) never affects the scheduler or other jobs; it simply becomes
/// eligible again once its period has elapsed.
pub trait BackgroundJob: Send + Sync {
    /// Unique identifier for this job. Registering two jobs with the same
    /// id is a startup error.
    fn id(&self) -> &'static str;

    /// Human-readable name.
    fn name(&self) -> &'static str;

    /// What this job does.
    fn description(&self) -> &'static str;

    /// How much time must pass after a completed run before the job is due
    /// again.
    fn period(&self) -> Duration;

    /// Execute the job. Called via `spawn_blocking`.
    fn execute(&self, ctx: &JobContext) -> Result<(), JobError>;
}

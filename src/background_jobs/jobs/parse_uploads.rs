//! Periodic batch parse of pending uploads.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::ingest::FileIngestor;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Background job that parses every uploaded file not yet reflected in its
/// host's record.
pub struct ParseUploadsJob {
    ingestor: Arc<FileIngestor>,
    period: Duration,
}

impl ParseUploadsJob {
    pub fn new(ingestor: Arc<FileIngestor>, period: Duration) -> Self {
        Self { ingestor, period }
    }
}

impl BackgroundJob for ParseUploadsJob {
    fn id(&self) -> &'static str {
        "parse_uploads"
    }

    fn name(&self) -> &'static str {
        "Parse Uploads"
    }

    fn description(&self) -> &'static str {
        "Parse pending uploaded command output into host records"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        if ctx.is_cancelled() {
            return Err(JobError::Cancelled);
        }

        let parsed = self
            .ingestor
            .parse_pending()
            .map_err(|e| JobError::ExecutionFailed(e.to_string()))?;

        if parsed > 0 {
            info!("Parsed {} uploaded files", parsed);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory_store::{InventoryStore, SqliteInventoryStore};
    use tokio_util::sync::CancellationToken;

    fn job_with_store() -> (Arc<SqliteInventoryStore>, ParseUploadsJob, JobContext) {
        let store = Arc::new(SqliteInventoryStore::in_memory().unwrap());
        let ingestor = Arc::new(FileIngestor::new(store.clone()));
        let job = ParseUploadsJob::new(ingestor, Duration::from_secs(120));
        let ctx = JobContext::new(CancellationToken::new(), store.clone());
        (store, job, ctx)
    }

    #[test]
    fn job_metadata() {
        let (_store, job, _ctx) = job_with_store();
        assert_eq!(job.id(), "parse_uploads");
        assert_eq!(job.period(), Duration::from_secs(120));
        assert!(!job.description().is_empty());
    }

    #[test]
    fn execute_parses_pending_files() {
        let (store, job, ctx) = job_with_store();
        store
            .insert_uploaded_file("1234", "/bin/uname -r", "4.15.13-300.fc27.x86_64", 100)
            .unwrap();

        job.execute(&ctx).unwrap();

        let host = store.get_host("1234").unwrap().unwrap();
        assert_eq!(host.kernel.as_deref(), Some("4.15.13-300.fc27.x86_64"));
    }

    #[test]
    fn cancelled_context_short_circuits() {
        let (_store, job, ctx) = job_with_store();
        ctx.cancellation_token.cancel();
        assert!(matches!(job.execute(&ctx), Err(JobError::Cancelled)));
    }
}

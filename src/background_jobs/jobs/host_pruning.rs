//! Retention of inactive hosts.
//!
//! Hosts unseen past the archive threshold lose their live record while
//! their uploaded files are kept for audit (marked not current); hosts
//! unseen past the delete threshold are removed outright, files included.

use crate::background_jobs::{BackgroundJob, JobContext, JobError};
use crate::inventory_store::{SETTING_DAYS_BEFORE_ARCHIVE, SETTING_DAYS_BEFORE_DELETE};
use chrono::Utc;
use std::time::Duration;
use tracing::info;

/// Fallbacks when the settings table carries no thresholds.
pub const DEFAULT_ARCHIVE_DAYS: i64 = 30;
pub const DEFAULT_DELETE_DAYS: i64 = 180;

pub struct HostPruningJob {
    period: Duration,
}

impl HostPruningJob {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }
}

impl BackgroundJob for HostPruningJob {
    fn id(&self) -> &'static str {
        "host_pruning"
    }

    fn name(&self) -> &'static str {
        "Host Pruning"
    }

    fn description(&self) -> &'static str {
        "Archive or delete hosts not seen within the retention thresholds"
    }

    fn period(&self) -> Duration {
        self.period
    }

    fn execute(&self, ctx: &JobContext) -> Result<(), JobError> {
        let store = &ctx.inventory_store;
        let to_job_err = |e: anyhow::Error| JobError::ExecutionFailed(e.to_string());

        let archive_days = store
            .get_setting_int(SETTING_DAYS_BEFORE_ARCHIVE)
            .map_err(to_job_err)?
            .unwrap_or(DEFAULT_ARCHIVE_DAYS);
        let delete_days = store
            .get_setting_int(SETTING_DAYS_BEFORE_DELETE)
            .map_err(to_job_err)?
            .unwrap_or(DEFAULT_DELETE_DAYS);

        let now = Utc::now().timestamp();
        let hosts = store.host_ages(now).map_err(to_job_err)?;

        let mut archived = 0;
        let mut deleted = 0;
        for host in hosts {
            if ctx.is_cancelled() {
                return Err(JobError::Cancelled);
            }
            // Delete is checked first: a host past both thresholds is
            // deleted, never archived. A threshold of zero or less
            // disables that action.
            if delete_days > 0 && host.days_since_seen >= delete_days {
                store.delete_host(&host.certfp).map_err(to_job_err)?;
                store
                    .delete_files_for_host(&host.certfp)
                    .map_err(to_job_err)?;
                deleted += 1;
            } else if archive_days > 0 && host.days_since_seen >= archive_days {
                store
                    .archive_files_for_host(&host.certfp)
                    .map_err(to_job_err)?;
                store.delete_host(&host.certfp).map_err(to_job_err)?;
                archived += 1;
            }
        }

        if archived > 0 || deleted > 0 {
            info!("Archived {} hosts, deleted {} hosts", archived, deleted);
        }
        Ok(())
    }
}

use super::context::JobContext;
use super::job::BackgroundJob;
use crate::server_store::{JobRunStatus, ServerStore};
use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Per-instance scheduler bookkeeping. Last-completed timestamps live only
/// here: a process restart makes every job immediately eligible again.
struct SchedulerState {
    jobs: HashMap<String, Arc<dyn BackgroundJob>>,
    running: HashSet<String>,
    last_completed: HashMap<String, DateTime<Utc>>,
}

/// Fixed-tick driver for background jobs.
///
/// On every tick, each registered job whose period has elapsed since its
/// last completed run is dispatched as an independent task. A job never
/// overlaps itself; distinct jobs run concurrently. Failures and panics
/// are contained at the dispatch boundary and recorded in run history.
pub struct JobScheduler {
    state: Arc<RwLock<SchedulerState>>,
    server_store: Arc<dyn ServerStore>,
    job_context: JobContext,
    tick_interval: Duration,
    shutdown_token: CancellationToken,
}

impl JobScheduler {
    pub fn new(
        server_store: Arc<dyn ServerStore>,
        job_context: JobContext,
        tick_interval: Duration,
        shutdown_token: CancellationToken,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(SchedulerState {
                jobs: HashMap::new(),
                running: HashSet::new(),
                last_completed: HashMap::new(),
            })),
            server_store,
            job_context,
            tick_interval,
            shutdown_token,
        }
    }

    /// Register a job. Two jobs sharing an id is a composition mistake and
    /// fails fast at startup.
    pub async fn register_job(&self, job: Arc<dyn BackgroundJob>) -> Result<()> {
        let job_id = job.id().to_string();
        let mut state = self.state.write().await;
        if state.jobs.contains_key(&job_id) {
            bail!("A job with id '{}' is already registered", job_id);
        }
        info!("Registering job: {} - {}", job_id, job.description());
        state.jobs.insert(job_id, job);
        Ok(())
    }

    pub async fn job_count(&self) -> usize {
        self.state.read().await.jobs.len()
    }

    /// Main scheduler loop. Returns when the shutdown token fires.
    pub async fn run(&self) {
        let job_count = self.job_count().await;
        info!("Starting job scheduler with {} registered jobs", job_count);

        // Close out run records left behind by a previous process
        match self.server_store.mark_stale_jobs_failed() {
            Ok(count) if count > 0 => {
                info!("Marked {} stale job runs as failed from previous run", count);
            }
            Ok(_) => {}
            Err(e) => error!("Failed to mark stale job runs: {}", e),
        }

        let mut triggered_by = "startup";
        loop {
            self.run_due_jobs(triggered_by).await;
            triggered_by = "schedule";

            tokio::select! {
                _ = tokio::time::sleep(self.tick_interval) => {}
                _ = self.shutdown_token.cancelled() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
            }
        }

        info!("Job scheduler stopped");
    }

    async fn run_due_jobs(&self, triggered_by: &str) {
        let now = Utc::now();
        let due: Vec<Arc<dyn BackgroundJob>> = {
            let state = self.state.read().await;
            state
                .jobs
                .values()
                .filter(|job| {
                    if state.running.contains(job.id()) {
                        return false;
                    }
                    match state.last_completed.get(job.id()) {
                        None => true,
                        Some(completed_at) => now
                            .signed_duration_since(*completed_at)
                            .to_std()
                            .map(|elapsed| elapsed >= job.period())
                            .unwrap_or(true),
                    }
                })
                .cloned()
                .collect()
        };

        for job in due {
            self.spawn_job(job, triggered_by).await;
        }
    }

    async fn spawn_job(&self, job: Arc<dyn BackgroundJob>, triggered_by: &str) {
        let job_id = job.id().to_string();

        let run_id = match self.server_store.record_job_start(&job_id, triggered_by) {
            Ok(id) => id,
            Err(e) => {
                // Leave the job eligible; the next tick retries
                error!("Failed to record job start for {}: {}", job_id, e);
                return;
            }
        };

        debug!(
            "Starting job: {} (run {}, triggered by {})",
            job_id, run_id, triggered_by
        );

        {
            let mut state = self.state.write().await;
            state.running.insert(job_id.clone());
        }

        let ctx = JobContext::new(
            self.job_context.cancellation_token.child_token(),
            Arc::clone(&self.job_context.inventory_store),
        );
        let server_store = Arc::clone(&self.server_store);
        let state = Arc::clone(&self.state);

        // Jobs are synchronous; run them off the scheduler's executor
        tokio::spawn(async move {
            let start_time = Instant::now();
            let result = tokio::task::spawn_blocking(move || job.execute(&ctx)).await;
            let elapsed = start_time.elapsed();

            let (status, error_msg) = match result {
                Ok(Ok(())) => {
                    info!("Job {} completed in {:?}", job_id, elapsed);
                    (JobRunStatus::Completed, None)
                }
                Ok(Err(e)) => {
                    error!("Job {} failed after {:?}: {}", job_id, elapsed, e);
                    (JobRunStatus::Failed, Some(e.to_string()))
                }
                Err(e) => {
                    error!("Job {} panicked after {:?}: {}", job_id, elapsed, e);
                    (JobRunStatus::Failed, Some(format!("Task panic: {}", e)))
                }
            };

            if let Err(e) = server_store.record_job_finish(run_id, status, error_msg) {
                error!("Failed to record job finish for {}: {}", job_id, e);
            }

            let mut state = state.write().await;
            state.running.remove(&job_id);
            state.last_completed.insert(job_id, Utc::now());
        });
    }
}

use crate::error::AppResult;
use chrono::{NaiveDateTime, Utc};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{error, info};

/// One scheduled task: a name, an interval, and the work itself.
///
/// Jobs are plain values registered on an injected scheduler instance;
/// nothing in the codebase reaches for an ambient or global scheduler.
pub struct Job {
    name: &'static str,
    interval: Duration,
    task: Arc<dyn Fn() -> BoxFuture<'static, AppResult<()>> + Send + Sync>,
}

impl Job {
    /// Define a job from an interval and an async closure
    pub fn new<F, Fut>(name: &'static str, interval: Duration, task: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = AppResult<()>> + Send + 'static,
    {
        Self {
            name,
            interval,
            task: Arc::new(move || -> BoxFuture<'static, AppResult<()>> { Box::pin(task()) }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Bookkeeping for one job, readable by the health check
#[derive(Debug, Clone, Default)]
pub struct JobStatus {
    pub runs: u64,
    pub last_run: Option<NaiveDateTime>,
    pub last_error: Option<String>,
}

/// Shared per-job status registry
pub type SchedulerStatus = Arc<RwLock<HashMap<&'static str, JobStatus>>>;

/// Interval scheduler driving registered jobs until shutdown.
///
/// Each job runs on its own looping task: the first tick fires
/// immediately, a failed run is logged and recorded but never stops the
/// loop, and a slow run delays its own next tick rather than stacking up.
pub struct Scheduler {
    jobs: Vec<Job>,
    status: SchedulerStatus,
}

impl Scheduler {
    /// Create an empty scheduler
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            status: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a job definition
    pub fn register(&mut self, job: Job) {
        info!("Registered job '{}' (every {:?})", job.name(), job.interval);
        self.jobs.push(job);
    }

    /// Handle for reading job statuses after the scheduler is consumed
    pub fn status_handle(&self) -> SchedulerStatus {
        self.status.clone()
    }

    /// Spawn one task per registered job, stopping them all when the
    /// shutdown channel flips
    pub fn spawn_all(self, shutdown: watch::Receiver<bool>) -> Vec<JoinHandle<()>> {
        let Scheduler { jobs, status } = self;

        jobs.into_iter()
            .map(|job| {
                let status = status.clone();
                let mut shutdown = shutdown.clone();

                tokio::spawn(async move {
                    let mut interval = time::interval(job.interval);
                    interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                let started = Utc::now().naive_utc();
                                let result = (job.task)().await;

                                let mut map = status.write().await;
                                let entry = map.entry(job.name).or_default();
                                entry.runs += 1;
                                entry.last_run = Some(started);

                                match result {
                                    Ok(()) => {
                                        entry.last_error = None;
                                    }
                                    Err(e) => {
                                        error!("Job '{}' failed: {}", job.name, e);
                                        entry.last_error = Some(e.to_string());
                                    }
                                }
                            }
                            _ = shutdown.changed() => {
                                info!("Job '{}' stopping", job.name);
                                break;
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_job_runs_immediately_and_stops_on_shutdown() {
        let counter = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new();
        let status = scheduler.status_handle();

        let c = counter.clone();
        scheduler.register(Job::new(
            "test-job",
            Duration::from_secs(3600),
            move || {
                let c = c.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            },
        ));

        let (tx, rx) = watch::channel(false);
        let handles = scheduler.spawn_all(rx);

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        let map = status.read().await;
        let job_status = map.get("test-job").unwrap();
        assert_eq!(job_status.runs, 1);
        assert!(job_status.last_error.is_none());
        assert!(job_status.last_run.is_some());
    }

    #[tokio::test]
    async fn test_failed_run_is_recorded_but_does_not_stop_the_job() {
        let mut scheduler = Scheduler::new();
        let status = scheduler.status_handle();

        scheduler.register(Job::new(
            "failing-job",
            Duration::from_millis(20),
            || async { Err(crate::error::AppError::Message("boom".to_string())) },
        ));

        let (tx, rx) = watch::channel(false);
        let handles = scheduler.spawn_all(rx);

        // Let it fail at least twice to prove the loop survives errors
        tokio::time::sleep(Duration::from_millis(90)).await;

        tx.send(true).unwrap();
        for handle in handles {
            handle.await.unwrap();
        }

        let map = status.read().await;
        let job_status = map.get("failing-job").unwrap();
        assert!(job_status.runs >= 2);
        assert_eq!(job_status.last_error.as_deref(), Some("boom"));
    }
}

//! Periodic background jobs.
//!
//! Each job gets its own task driven by a `tokio::time::interval`. The first
//! run happens one full interval after start-up, and a job's next tick is
//! only awaited after its previous run returned, so runs of the same job
//! never overlap. All tasks share a [`CancellationToken`] for shutdown.

use std::{sync::Arc, time::Duration};

use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::error::AppResult;

#[async_trait::async_trait]
pub trait Job: Send + Sync {
    fn name(&self) -> &'static str;

    fn interval(&self) -> Duration;

    async fn run(&self) -> AppResult<()>;
}

#[derive(Default)]
pub struct Scheduler {
    jobs: Vec<Arc<dyn Job>>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_job(mut self, job: Arc<dyn Job>) -> Self {
        self.jobs.push(job);
        self
    }

    /// Starts one task per job on the current runtime
    pub fn spawn(self) -> SchedulerHandle {
        let cancel = CancellationToken::new();
        let tasks = self
            .jobs
            .into_iter()
            .map(|job| tokio::spawn(drive(job, cancel.clone())))
            .collect();

        SchedulerHandle { cancel, tasks }
    }
}

pub struct SchedulerHandle {
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl SchedulerHandle {
    /// Stops every job and waits for in-flight runs to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::error!(error = %e, "Scheduled job task panicked");
            }
        }
    }
}

async fn drive(job: Arc<dyn Job>, cancel: CancellationToken) {
    let period = job.interval();
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::info!(
        job = job.name(),
        interval_secs = period.as_secs(),
        "Scheduled job started"
    );

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = job.name(), "Scheduled job stopping");
                break;
            }
            _ = ticker.tick() => {
                let started = Instant::now();
                match job.run().await {
                    Ok(()) => tracing::debug!(
                        job = job.name(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Scheduled job run finished"
                    ),
                    Err(e) => tracing::error!(job = job.name(), error = %e, "Scheduled job run failed"),
                }
            }
        }
    }
}

// Worker - scheduling loop
// One dequeued item at a time, awaiting full dispatch before the next.

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::dispatcher::Dispatcher;
use crate::application::queue::SharedQueue;
use crate::domain::ProcessResult;
use crate::error::Result;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, Instant};
use tracing::{info, warn};

pub struct Worker {
    dispatcher: Arc<Dispatcher>,
    queue: SharedQueue,
    idle_sleep: Duration,
    stale_threshold_ms: i64,
    paused: watch::Sender<bool>,
}

impl Worker {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        let queue = dispatcher.queue().clone();
        let (paused, _) = watch::channel(false);
        Self {
            dispatcher,
            queue,
            idle_sleep: IDLE_SLEEP_DURATION,
            stale_threshold_ms: DEFAULT_STALE_JOB_THRESHOLD_MS,
            paused,
        }
    }

    pub fn with_idle_sleep(mut self, idle_sleep: Duration) -> Self {
        self.idle_sleep = idle_sleep;
        self
    }

    pub fn with_stale_threshold_ms(mut self, threshold_ms: i64) -> Self {
        self.stale_threshold_ms = threshold_ms;
        self
    }

    /// Stop dequeuing after the current dispatch; queued work stays in place
    pub fn pause(&self) {
        if !self.paused.send_replace(true) {
            info!("Worker paused");
        }
    }

    pub fn resume(&self) {
        if self.paused.send_replace(false) {
            info!("Worker resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }

    /// Run until `shutdown` fires. An in-flight dispatch is always finished.
    /// While paused the loop only waits for resume or shutdown.
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!("Worker started");
        let mut last_stale_check = Instant::now();

        loop {
            if shutdown.is_shutdown() {
                break;
            }

            if self.is_paused() {
                let mut paused = self.paused.subscribe();
                tokio::select! {
                    _ = paused.wait_for(|p| !*p) => {}
                    _ = shutdown.wait() => {
                        info!("Worker received shutdown signal while paused");
                        break;
                    }
                }
                continue;
            }

            if last_stale_check.elapsed() >= STALE_CHECK_INTERVAL {
                self.report_stale_jobs().await;
                last_stale_check = Instant::now();
            }

            if self.process_next().await.is_none() {
                tokio::select! {
                    _ = sleep(self.idle_sleep) => {}
                    _ = shutdown.wait() => {
                        info!("Worker received shutdown signal");
                        break;
                    }
                }
            }
        }

        let left = self.queue.lock().await.size();
        if left > 0 {
            warn!(pending = left, "Worker stopped with jobs still queued");
        }
        info!("Worker stopped");
        Ok(())
    }

    /// Dequeue and dispatch one entry; `None` when the queue was empty.
    /// Not gated by `pause`.
    pub async fn process_next(&self) -> Option<ProcessResult> {
        // Lock is released before dispatch so producers are not blocked
        let job = self.queue.lock().await.dequeue()?;
        Some(self.dispatcher.dispatch(job).await)
    }

    /// Warn about entries older than the stale threshold; returns how many
    pub async fn report_stale_jobs(&self) -> usize {
        let queue = self.queue.lock().await;
        let stale = queue.stale_jobs(self.stale_threshold_ms);
        for job in &stale {
            warn!(
                queue_id = %job.id,
                job_type = %job.job_type,
                created_at = job.created_at,
                background_job_id = ?job.background_job_id(),
                "Queued job waiting longer than threshold"
            );
        }
        stale.len()
    }
}

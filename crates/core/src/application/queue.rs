//! In-memory priority queue of pending work
//!
//! Ordering: `priority` descending, then `created_at` ascending, with equal
//! keys kept in insertion order (stable sort). The queue has no internal
//! synchronization; a multi-task owner wraps it in [`SharedQueue`].

use crate::domain::{JobSpec, Priority, QueueJobId, QueuedJob, MIN_PRIORITY};
use crate::port::{IdProvider, TimeProvider};
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Queue handle shared between the scheduling loop and other callers
pub type SharedQueue = Arc<tokio::sync::Mutex<JobQueue>>;

/// Snapshot of queue contents
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueueStats {
    pub total: usize,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_type: BTreeMap<String, usize>,
    /// Cumulative successful re-enqueues since construction
    pub total_retries: u64,
}

pub struct JobQueue {
    jobs: VecDeque<QueuedJob>,
    total_retries: u64,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl JobQueue {
    pub fn new(id_provider: Arc<dyn IdProvider>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            jobs: VecDeque::new(),
            total_retries: 0,
            id_provider,
            time_provider,
        }
    }

    pub fn into_shared(self) -> SharedQueue {
        Arc::new(tokio::sync::Mutex::new(self))
    }

    /// Insert new work (attempt 1) and return its queue id
    ///
    /// Priorities below `MIN_PRIORITY` are raised to it.
    pub fn enqueue(&mut self, spec: JobSpec) -> QueueJobId {
        let job = QueuedJob {
            id: self.id_provider.generate_id(),
            job_type: spec.job_type,
            payload: spec.payload,
            priority: spec.priority.max(MIN_PRIORITY),
            created_at: self.time_provider.now_millis(),
            attempt: 1,
        };
        let id = job.id.clone();

        debug!(
            queue_id = %id,
            job_type = %job.job_type,
            priority = job.priority,
            background_job_id = ?job.background_job_id(),
            "Enqueued job"
        );

        self.insert(job);
        id
    }

    /// Schedule the next attempt of `job`
    ///
    /// Returns `None` without touching the queue once the attempt budget is
    /// spent. Otherwise a fresh entry is minted with `attempt + 1` and the
    /// priority lowered by one (floor 1), carrying the same payload.
    pub fn re_enqueue(&mut self, job: &QueuedJob) -> Option<QueueJobId> {
        if !job.has_attempts_left() {
            warn!(
                queue_id = %job.id,
                attempt = job.attempt,
                background_job_id = ?job.background_job_id(),
                "Retry budget exhausted, not re-enqueuing"
            );
            return None;
        }

        if let Some(bg_id) = job.background_job_id() {
            if self.contains_background_job(bg_id) {
                warn!(
                    background_job_id = %bg_id,
                    "Background job already has a queue entry; re-enqueuing anyway"
                );
            }
        }

        let retry = QueuedJob {
            id: self.id_provider.generate_id(),
            job_type: job.job_type.clone(),
            payload: job.payload.clone(),
            priority: job.retry_priority(),
            created_at: self.time_provider.now_millis(),
            attempt: job.attempt + 1,
        };
        let id = retry.id.clone();

        info!(
            previous_queue_id = %job.id,
            queue_id = %id,
            attempt = retry.attempt,
            priority = retry.priority,
            "Re-enqueued job for retry"
        );

        self.insert(retry);
        self.total_retries += 1;
        Some(id)
    }

    /// Remove and return the highest-priority, oldest entry
    pub fn dequeue(&mut self) -> Option<QueuedJob> {
        self.jobs.pop_front()
    }

    pub fn peek(&self) -> Option<&QueuedJob> {
        self.jobs.front()
    }

    /// Remove one entry by queue id
    pub fn remove(&mut self, id: &str) -> bool {
        match self.jobs.iter().position(|j| j.id == id) {
            Some(idx) => {
                self.jobs.remove(idx);
                debug!(queue_id = %id, "Removed job from queue");
                true
            }
            None => false,
        }
    }

    /// Remove every entry belonging to a session
    pub fn remove_by_session_id(&mut self, session_id: &str) -> usize {
        let removed = self.remove_where(|j| j.session_id() == Some(session_id));
        debug!(session_id = %session_id, removed, "Removed session jobs from queue");
        removed
    }

    /// Remove every entry for a logical job
    pub fn remove_by_background_job_id(&mut self, background_job_id: &str) -> usize {
        let removed = self.remove_where(|j| j.background_job_id() == Some(background_job_id));
        debug!(
            background_job_id = %background_job_id,
            removed,
            "Removed background job entries from queue"
        );
        removed
    }

    pub fn contains_background_job(&self, background_job_id: &str) -> bool {
        self.jobs
            .iter()
            .any(|j| j.background_job_id() == Some(background_job_id))
    }

    pub fn size(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn stats(&self) -> QueueStats {
        let mut stats = QueueStats {
            total: self.jobs.len(),
            total_retries: self.total_retries,
            ..Default::default()
        };
        for job in &self.jobs {
            *stats.by_priority.entry(job.priority).or_insert(0) += 1;
            *stats
                .by_type
                .entry(job.job_type.as_str().to_string())
                .or_insert(0) += 1;
        }
        stats
    }

    /// Drop all pending entries (the retry counter is kept)
    pub fn clear(&mut self) {
        let dropped = self.jobs.len();
        self.jobs.clear();
        info!(dropped, "Cleared job queue");
    }

    /// Entries that have waited longer than `threshold_ms`
    pub fn stale_jobs(&self, threshold_ms: i64) -> Vec<&QueuedJob> {
        let now = self.time_provider.now_millis();
        self.jobs
            .iter()
            .filter(|j| now - j.created_at > threshold_ms)
            .collect()
    }

    fn insert(&mut self, job: QueuedJob) {
        self.jobs.push_back(job);
        self.sort();
    }

    fn remove_where(&mut self, pred: impl Fn(&QueuedJob) -> bool) -> usize {
        let before = self.jobs.len();
        self.jobs.retain(|j| !pred(j));
        self.sort();
        before - self.jobs.len()
    }

    fn sort(&mut self) {
        // slice::sort_by is stable
        self.jobs.make_contiguous().sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then_with(|| a.created_at.cmp(&b.created_at))
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{JobPayload, JobType, MAX_ATTEMPTS};
    use crate::port::id_provider::mocks::SequentialIdProvider;
    use crate::port::time_provider::mocks::ManualTimeProvider;
    use serde_json::json;

    fn setup() -> (JobQueue, Arc<ManualTimeProvider>) {
        let clock = Arc::new(ManualTimeProvider::new(1_000));
        let queue = JobQueue::new(Arc::new(SequentialIdProvider::new("q")), clock.clone());
        (queue, clock)
    }

    fn spec(job_type: &str, bg: &str, session: &str, priority: i32) -> JobSpec {
        JobSpec::new(
            JobType::new(job_type),
            JobPayload::for_job(bg, session, json!({})),
            priority,
        )
    }

    fn drain_bg_ids(queue: &mut JobQueue) -> Vec<String> {
        std::iter::from_fn(|| queue.dequeue())
            .map(|j| j.background_job_id().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_enqueue_assigns_fresh_entry() {
        let (mut queue, _) = setup();
        let id = queue.enqueue(spec("text", "bg-1", "s", 5));

        let head = queue.peek().unwrap();
        assert_eq!(head.id, id);
        assert_eq!(head.attempt, 1);
        assert_eq!(head.created_at, 1_000);
        assert_ne!(head.id, "bg-1");
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn test_priority_then_fifo() {
        let (mut queue, clock) = setup();
        queue.enqueue(spec("t", "a", "s", 5));
        clock.advance(1);
        queue.enqueue(spec("t", "b", "s", 5));
        clock.advance(1);
        queue.enqueue(spec("t", "c", "s", 1));
        clock.advance(1);
        queue.enqueue(spec("t", "d", "s", 9));

        assert_eq!(drain_bg_ids(&mut queue), vec!["d", "a", "b", "c"]);
    }

    #[test]
    fn test_identical_keys_keep_insertion_order() {
        // clock never advances: same priority and same created_at
        let (mut queue, _) = setup();
        for bg in ["first", "second", "third"] {
            queue.enqueue(spec("t", bg, "s", 3));
        }
        assert_eq!(drain_bg_ids(&mut queue), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_peek_does_not_remove() {
        let (mut queue, _) = setup();
        queue.enqueue(spec("t", "a", "s", 1));
        assert!(queue.peek().is_some());
        assert_eq!(queue.size(), 1);
        assert!(queue.dequeue().is_some());
        assert!(queue.dequeue().is_none());
        assert!(queue.peek().is_none());
    }

    #[test]
    fn test_re_enqueue_progression() {
        let (mut queue, clock) = setup();
        queue.enqueue(spec("t", "bg-1", "s", 5));
        let first = queue.dequeue().unwrap();

        clock.advance(50);
        let new_id = queue.re_enqueue(&first).unwrap();
        assert_ne!(new_id, first.id);
        assert_eq!(queue.size(), 1);

        let retry = queue.peek().unwrap();
        assert_eq!(retry.attempt, 2);
        assert_eq!(retry.priority, 4);
        assert_eq!(retry.created_at, 1_050);
        assert_eq!(retry.payload, first.payload);
        assert_eq!(queue.stats().total_retries, 1);
    }

    #[test]
    fn test_re_enqueue_priority_floor() {
        let (mut queue, _) = setup();
        queue.enqueue(spec("t", "bg-1", "s", 1));
        let job = queue.dequeue().unwrap();
        queue.re_enqueue(&job).unwrap();
        assert_eq!(queue.peek().unwrap().priority, 1);
    }

    #[test]
    fn test_enqueue_raises_priority_to_floor() {
        let (mut queue, clock) = setup();
        queue.enqueue(spec("t", "zero", "s", 0));
        clock.advance(1);
        queue.enqueue(spec("t", "min", "s", i32::MIN));

        assert!(queue.stats().by_priority.keys().all(|p| *p == MIN_PRIORITY));
        let first = queue.dequeue().unwrap();
        assert_eq!(first.priority, MIN_PRIORITY);
        assert_eq!(first.background_job_id(), Some("zero"));
    }

    #[test]
    fn test_re_enqueue_lowest_priority_stays_at_floor() {
        let (mut queue, _) = setup();
        queue.enqueue(spec("t", "bg-1", "s", i32::MIN));
        let mut job = queue.dequeue().unwrap();
        // entries built outside enqueue are not clamped
        job.priority = i32::MIN;

        queue.re_enqueue(&job).unwrap();
        let retry = queue.peek().unwrap();
        assert_eq!(retry.priority, MIN_PRIORITY);
        assert_eq!(retry.attempt, 2);
    }

    #[test]
    fn test_re_enqueue_exhausted() {
        let (mut queue, _) = setup();
        queue.enqueue(spec("t", "bg-1", "s", 5));
        let mut job = queue.dequeue().unwrap();
        job.attempt = MAX_ATTEMPTS;

        assert!(queue.re_enqueue(&job).is_none());
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.stats().total_retries, 0);
    }

    #[test]
    fn test_retry_does_not_starve_fresh_work() {
        let (mut queue, clock) = setup();
        queue.enqueue(spec("t", "failing", "s", 5));
        let failing = queue.dequeue().unwrap();
        clock.advance(1);
        queue.enqueue(spec("t", "fresh", "s", 5));
        clock.advance(1);
        queue.re_enqueue(&failing).unwrap();

        assert_eq!(drain_bg_ids(&mut queue), vec!["fresh", "failing"]);
    }

    #[test]
    fn test_targeted_removal() {
        let (mut queue, _) = setup();
        let keep = queue.enqueue(spec("t", "bg-1", "s-1", 1));
        queue.enqueue(spec("t", "bg-2", "s-1", 2));
        queue.enqueue(spec("t", "bg-2", "s-2", 3));
        queue.enqueue(spec("t", "bg-3", "s-2", 4));

        assert_eq!(queue.remove_by_background_job_id("bg-2"), 2);
        assert!(!queue.contains_background_job("bg-2"));
        assert_eq!(queue.size(), 2);

        assert_eq!(queue.remove_by_session_id("s-2"), 1);
        assert_eq!(queue.size(), 1);
        assert_eq!(queue.peek().unwrap().id, keep);

        assert!(queue.remove(&keep));
        assert!(!queue.remove(&keep));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_removal_keeps_order() {
        let (mut queue, clock) = setup();
        for (bg, p) in [("a", 2), ("b", 9), ("c", 2), ("d", 5)] {
            queue.enqueue(spec("t", bg, "s", p));
            clock.advance(1);
        }
        queue.remove_by_background_job_id("d");
        assert_eq!(drain_bg_ids(&mut queue), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_stats_and_clear() {
        let (mut queue, _) = setup();
        queue.enqueue(spec("text", "a", "s", 5));
        queue.enqueue(spec("text", "b", "s", 1));
        queue.enqueue(spec("transcribe", "c", "s", 5));

        let stats = queue.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.by_priority.get(&5), Some(&2));
        assert_eq!(stats.by_priority.get(&1), Some(&1));
        assert_eq!(stats.by_type.get("text"), Some(&2));
        assert_eq!(stats.by_type.get("transcribe"), Some(&1));

        queue.clear();
        assert_eq!(queue.size(), 0);
        assert_eq!(queue.stats().total, 0);
    }

    #[test]
    fn test_stale_jobs() {
        let (mut queue, clock) = setup();
        queue.enqueue(spec("t", "old", "s", 1));
        clock.advance(10_000);
        queue.enqueue(spec("t", "new", "s", 1));
        clock.advance(1_000);

        let stale = queue.stale_jobs(5_000);
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].background_job_id(), Some("old"));
    }
}

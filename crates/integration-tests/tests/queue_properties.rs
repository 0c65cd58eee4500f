//! JobQueue ordering and retry-budget properties

use std::sync::Arc;

use jobrelay_core::application::JobQueue;
use jobrelay_core::domain::{JobPayload, JobSpec, JobType, MAX_ATTEMPTS};
use jobrelay_core::port::id_provider::mocks::SequentialIdProvider;
use jobrelay_core::port::time_provider::mocks::ManualTimeProvider;
use serde_json::json;

fn queue() -> (JobQueue, Arc<ManualTimeProvider>) {
    let clock = Arc::new(ManualTimeProvider::new(1_000));
    let queue = JobQueue::new(Arc::new(SequentialIdProvider::new("q")), clock.clone());
    (queue, clock)
}

fn spec(job_type: &str, priority: i32, n: u32) -> JobSpec {
    JobSpec::new(
        JobType::new(job_type),
        JobPayload::for_job(format!("bg-{}", n), "s-1", json!({ "n": n })),
        priority,
    )
}

/// Dequeue order is priority descending, then FIFO within a priority
#[tokio::test]
async fn test_priority_then_fifo_order() {
    let (mut q, clock) = queue();
    let priorities = [3, 7, 3, 10, 7, 1, 3];
    for (n, priority) in priorities.iter().enumerate() {
        q.enqueue(spec("text", *priority, n as u32));
        clock.advance(1);
    }

    let mut order = Vec::new();
    while let Some(job) = q.dequeue() {
        order.push((job.priority, job.payload.as_value()["n"].as_u64().unwrap()));
    }
    assert_eq!(
        order,
        vec![(10, 3), (7, 1), (7, 4), (3, 0), (3, 2), (3, 6), (1, 5)]
    );

    println!("✅ Ordering: priority desc, created_at asc");
}

/// Same-millisecond entries keep insertion order
#[tokio::test]
async fn test_same_timestamp_is_stable() {
    let (mut q, _) = queue();
    for n in 0..20 {
        q.enqueue(spec("text", 5, n));
    }
    let ns: Vec<u64> = std::iter::from_fn(|| q.dequeue())
        .map(|j| j.payload.as_value()["n"].as_u64().unwrap())
        .collect();
    assert_eq!(ns, (0..20).collect::<Vec<u64>>());

    println!("✅ Ordering: stable under identical timestamps");
}

/// A logical job is tried at most MAX_ATTEMPTS times, losing one priority
/// point per retry down to the floor
#[tokio::test]
async fn test_retry_budget_and_priority_floor() {
    let (mut q, _) = queue();
    q.enqueue(spec("text", 2, 1));

    let mut attempts = Vec::new();
    let mut current = q.dequeue().unwrap();
    attempts.push((current.attempt, current.priority));
    while q.re_enqueue(&current).is_some() {
        current = q.dequeue().unwrap();
        attempts.push((current.attempt, current.priority));
    }

    assert_eq!(attempts, vec![(1, 2), (2, 1), (3, 1)]);
    assert_eq!(attempts.len() as u32, MAX_ATTEMPTS);
    assert!(q.is_empty());
    assert_eq!(q.stats().total_retries, 2);

    println!("✅ Retry: budget of {} attempts, priority floor 1", MAX_ATTEMPTS);
}

/// Retry entries carry the same payload under a fresh id
#[tokio::test]
async fn test_retry_keeps_payload_with_new_id() {
    let (mut q, _) = queue();
    q.enqueue(spec("text", 5, 9));
    let first = q.dequeue().unwrap();
    let retry_id = q.re_enqueue(&first).unwrap();

    let retry = q.dequeue().unwrap();
    assert_eq!(retry.id, retry_id);
    assert_ne!(retry.id, first.id);
    assert_eq!(retry.payload, first.payload);
    assert_eq!(retry.background_job_id(), Some("bg-9"));

    println!("✅ Retry: fresh id, same payload");
}

#[tokio::test]
async fn test_removal_and_stats() {
    let (mut q, _) = queue();
    let keep = q.enqueue(spec("text", 5, 1));
    q.enqueue(JobSpec::new(
        JobType::new("audio"),
        JobPayload::for_job("bg-2", "s-2", json!({})),
        8,
    ));
    q.enqueue(spec("text", 5, 3));

    assert_eq!(q.remove_by_session_id("s-2"), 1);
    assert_eq!(q.remove_by_background_job_id("bg-3"), 1);
    assert!(!q.remove("missing"));

    let stats = q.stats();
    assert_eq!(stats.total, 1);
    assert_eq!(stats.by_type.get("text"), Some(&1));
    assert_eq!(q.peek().unwrap().id, keep);

    println!("✅ Removal: by session, by background job, by id");
}

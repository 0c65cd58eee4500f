//! JSON-RPC surface over a live server

mod common;

use std::sync::Arc;

use common::{harness, JOB_TYPE};
use jobrelay_api_rpc::error::code;
use jobrelay_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use jobrelay_core::application::{CancellationService, JobSubmissionService, ProcessorRegistry};
use jobrelay_core::domain::JobType;
use jobrelay_core::port::processor::mocks::ScriptedProcessor;
use jobrelay_core::port::status_repository::mocks::InMemoryStatusRepository;
use jobrelay_core::port::time_provider::SystemTimeProvider;
use jobrelay_core::port::TimeProvider;
use jsonrpsee::core::client::{ClientT, Error as ClientError};
use jsonrpsee::core::params::ObjectParams;
use jsonrpsee::http_client::HttpClientBuilder;
use jsonrpsee::rpc_params;
use serde_json::Value;

#[tokio::test]
async fn test_submit_list_cancel_over_http() {
    let clock: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let repo = Arc::new(InMemoryStatusRepository::new(clock.clone()));
    let h = harness(repo.clone(), clock, vec![]);

    let mut registry = ProcessorRegistry::new();
    registry.register(
        JobType::new(JOB_TYPE),
        Arc::new(ScriptedProcessor::always_succeed("noop")),
    );
    let handler = Arc::new(RpcHandler::new(
        Arc::new(JobSubmissionService::new(h.status.clone(), h.queue.clone())),
        Arc::new(CancellationService::new(h.status.clone(), h.queue.clone())),
        repo,
        Arc::new(registry),
        h.queue.clone(),
    ));

    let config = RpcServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let (addr, handle) = RpcServer::new(config, handler).start().await.unwrap();
    let client = HttpClientBuilder::default()
        .build(format!("http://{}", addr))
        .unwrap();

    // Submit
    let mut params = ObjectParams::new();
    params.insert("session_id", "s-rpc").unwrap();
    params.insert("job_type", JOB_TYPE).unwrap();
    params.insert("api_type", "gemini").unwrap();
    params.insert("priority", 8).unwrap();
    params.insert("payload", serde_json::json!({"prompt": "hi"})).unwrap();
    let submitted: Value = client.request("jobs.submit.v1", params).await.unwrap();
    assert_eq!(submitted["status"], "queued");
    let bg_id = submitted["background_job_id"].as_str().unwrap().to_string();

    // Stats
    let stats: Value = client.request("queue.stats.v1", rpc_params![]).await.unwrap();
    assert_eq!(stats["total"], 1);
    assert_eq!(stats["by_priority"]["8"], 1);

    // Session listing
    let mut params = ObjectParams::new();
    params.insert("session_id", "s-rpc").unwrap();
    let listed: Value = client.request("sessions.jobs.v1", params).await.unwrap();
    assert_eq!(listed["jobs"][0]["id"], bg_id.as_str());
    assert_eq!(listed["jobs"][0]["status"], "queued");

    // Cancel
    let mut params = ObjectParams::new();
    params.insert("background_job_id", bg_id.as_str()).unwrap();
    let canceled: Value = client.request("jobs.cancel.v1", params).await.unwrap();
    assert_eq!(canceled["canceled"], true);
    assert_eq!(canceled["removed_from_queue"], 1);

    // Second cancel conflicts
    let mut params = ObjectParams::new();
    params.insert("background_job_id", bg_id.as_str()).unwrap();
    let err = client
        .request::<Value, _>("jobs.cancel.v1", params)
        .await
        .unwrap_err();
    match err {
        ClientError::Call(obj) => assert_eq!(obj.code(), code::CONFLICT),
        other => panic!("unexpected error: {:?}", other),
    }

    handle.stop().unwrap();
    println!("✅ RPC: submit, stats, list, cancel, conflict");
}

//! JobRelay - Main Entry Point
//! JSON-RPC server + single scheduling loop over an in-memory queue

mod config;
mod logging;
mod processors;

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{error, info, warn};

use config::DaemonConfig;
use jobrelay_api_rpc::{RpcHandler, RpcServer, RpcServerConfig};
use jobrelay_core::application::worker::constants::GRACEFUL_SHUTDOWN_TIMEOUT;
use jobrelay_core::application::{
    shutdown_channel, CancellationService, Dispatcher, JobQueue, JobStatusService,
    JobSubmissionService, ProcessorRegistry, Worker,
};
use jobrelay_core::domain::JobType;
use jobrelay_core::port::id_provider::UuidProvider;
use jobrelay_core::port::time_provider::SystemTimeProvider;
use jobrelay_core::port::{IdProvider, StatusRepository, TimeProvider};
use jobrelay_infra_sqlite::{create_pool, run_migrations, SqliteStatusRepository};
use processors::{EchoProcessor, ECHO_JOB_TYPE};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration and logging
    let config = DaemonConfig::from_env()?;
    let _log_guard = logging::init(&config.log)?;

    info!("JobRelay v{} starting...", VERSION);

    // 2. Database
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let db_url = config.db_path.to_string_lossy().into_owned();
    info!(db_path = %db_url, "Initializing database...");

    let pool = create_pool(&db_url)
        .await
        .context("DB pool creation failed")?;
    run_migrations(&pool).await.context("Migration failed")?;

    // 3. DI wiring
    let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
    let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);
    let status_repo: Arc<dyn StatusRepository> = Arc::new(SqliteStatusRepository::new(
        pool.clone(),
        id_provider.clone(),
        time_provider.clone(),
    ));
    let status = Arc::new(JobStatusService::new(
        status_repo.clone(),
        time_provider.clone(),
    ));
    let queue = JobQueue::new(id_provider, time_provider).into_shared();

    let mut registry = ProcessorRegistry::new();
    registry.register_unique(
        JobType::new(ECHO_JOB_TYPE),
        Arc::new(EchoProcessor::new(status.clone())),
    )?;
    let registry = Arc::new(registry);
    info!(job_types = ?registry.registered_job_types(), "Processors registered");

    let mut dispatcher = Dispatcher::new(registry.clone(), status.clone(), queue.clone());
    if let Some(timeout) = config.processor_timeout {
        dispatcher = dispatcher.with_processor_timeout(timeout);
    }
    let dispatcher = Arc::new(dispatcher);

    let submission = Arc::new(JobSubmissionService::new(status.clone(), queue.clone()));
    let cancellation = Arc::new(CancellationService::new(status, queue.clone()));

    // 4. JSON-RPC server
    let handler = Arc::new(RpcHandler::new(
        submission,
        cancellation,
        status_repo,
        registry,
        queue.clone(),
    ));
    let rpc_config = RpcServerConfig {
        host: config.rpc_host.clone(),
        port: config.rpc_port,
    };
    let (rpc_addr, rpc_handle) = RpcServer::new(rpc_config, handler)
        .start()
        .await
        .map_err(|e| anyhow::anyhow!("RPC server start failed: {}", e))?;

    // 5. Scheduling loop
    let (shutdown_tx, shutdown_rx) = shutdown_channel();
    let worker = Worker::new(dispatcher).with_stale_threshold_ms(config.stale_job_threshold_ms);
    let worker_handle = tokio::spawn(async move {
        if let Err(e) = worker.run(shutdown_rx).await {
            error!(error = ?e, "Worker failed");
        }
    });

    info!(rpc_addr = %rpc_addr, "System ready. Waiting for jobs...");
    info!("Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received. Exiting gracefully...");

    // 6. Graceful shutdown
    shutdown_tx.shutdown();
    rpc_handle
        .stop()
        .map_err(|e| anyhow::anyhow!("RPC server stop failed: {}", e))?;
    if tokio::time::timeout(GRACEFUL_SHUTDOWN_TIMEOUT, worker_handle)
        .await
        .is_err()
    {
        warn!("Worker did not stop within the shutdown timeout");
    }

    let pending = queue.lock().await.size();
    if pending > 0 {
        warn!(pending, "Dropping queued jobs on exit (queue is in-memory)");
    }
    pool.close().await;

    info!("Shutdown complete.");
    Ok(())
}

//! JSON-RPC Server
//!
//! JSON-RPC 2.0 over HTTP, bound to localhost by default.

use crate::handler::RpcHandler;
use crate::types::{CancelJobRequest, CancelSessionRequest, SessionJobsRequest, SubmitJobRequest};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

pub const DEFAULT_RPC_HOST: &str = "127.0.0.1";
pub const DEFAULT_RPC_PORT: u16 = 9637;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 picks a free port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, handler: Arc<RpcHandler>) -> Self {
        Self { config, handler }
    }

    /// Bind and start serving; returns the bound address and the stop handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let module = build_module(self.handler)?;

        info!(addr = %local_addr, "JSON-RPC server started successfully");
        Ok((local_addr, server.start(module)))
    }
}

/// Register every method on a fresh module
pub fn build_module(handler: Arc<RpcHandler>) -> Result<RpcModule<()>, String> {
    let mut module = RpcModule::new(());

    let h = handler.clone();
    module
        .register_async_method("jobs.submit.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: SubmitJobRequest = params.parse()?;
                handler.submit(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler.clone();
    module
        .register_async_method("jobs.cancel.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: CancelJobRequest = params.parse()?;
                handler.cancel_job(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler.clone();
    module
        .register_async_method("sessions.cancel.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: CancelSessionRequest = params.parse()?;
                handler.cancel_session(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler.clone();
    module
        .register_async_method("sessions.jobs.v1", move |params, _, _| {
            let handler = h.clone();
            async move {
                let req: SessionJobsRequest = params.parse()?;
                handler.session_jobs(req).await
            }
        })
        .map_err(|e| e.to_string())?;

    let h = handler;
    module
        .register_async_method("queue.stats.v1", move |_, _, _| {
            let handler = h.clone();
            async move { handler.queue_stats().await }
        })
        .map_err(|e| e.to_string())?;

    Ok(module)
}

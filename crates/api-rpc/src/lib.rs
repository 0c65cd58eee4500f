//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 surface over the submission, cancellation and queue
//! services of JobRelay.

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};

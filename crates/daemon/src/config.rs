//! Daemon configuration (environment variables only)

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const DEFAULT_DB_PATH: &str = "~/.jobrelay/jobs.db";
const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9637;
const DEFAULT_PROCESSOR_TIMEOUT_SECS: u64 = 300;
const DEFAULT_STALE_JOB_MINUTES: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    /// Daily rolling file output when set
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DaemonConfig {
    pub db_path: PathBuf,
    pub rpc_host: String,
    pub rpc_port: u16,
    /// `None` disables the per-call processor timeout
    pub processor_timeout: Option<Duration>,
    pub stale_job_threshold_ms: i64,
    pub log: LogConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let db_path = lookup("JOBRELAY_DB_PATH").unwrap_or_else(|| DEFAULT_DB_PATH.to_string());
        let db_path = PathBuf::from(shellexpand::tilde(&db_path).into_owned());

        let rpc_host =
            lookup("JOBRELAY_RPC_HOST").unwrap_or_else(|| DEFAULT_RPC_HOST.to_string());
        let rpc_port = parse_or(&lookup, "JOBRELAY_RPC_PORT", DEFAULT_RPC_PORT)?;

        let timeout_secs = parse_or(
            &lookup,
            "JOBRELAY_PROCESSOR_TIMEOUT_SECS",
            DEFAULT_PROCESSOR_TIMEOUT_SECS,
        )?;
        let processor_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        let stale_minutes = parse_or(
            &lookup,
            "JOBRELAY_STALE_JOB_MINUTES",
            DEFAULT_STALE_JOB_MINUTES,
        )?;

        let format = match lookup("JOBRELAY_LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };
        let dir = lookup("JOBRELAY_LOG_DIR")
            .filter(|d| !d.trim().is_empty())
            .map(|d| PathBuf::from(shellexpand::tilde(&d).into_owned()));

        Ok(Self {
            db_path,
            rpc_host,
            rpc_port,
            processor_timeout,
            stale_job_threshold_ms: stale_minutes * 60 * 1000,
            log: LogConfig { format, dir },
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}

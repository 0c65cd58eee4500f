// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration when the queue is empty (100ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(100);

/// How often the loop scans for entries waiting too long (1 min)
pub const STALE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Default age after which a waiting entry is reported stale (30 min)
pub const DEFAULT_STALE_JOB_THRESHOLD_MS: i64 = 30 * 60 * 1000;

/// Default upper bound for one processor call (5 min)
pub const DEFAULT_PROCESSOR_TIMEOUT: Duration = Duration::from_secs(300);

/// Time given to an in-flight dispatch during shutdown (5s)
pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

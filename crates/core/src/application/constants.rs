// Timing constants (no magic values in the loops)
use std::time::Duration;

/// Expiry sweep cadence (once per minute)
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Live countdown refresh cadence (once per second)
pub const COUNTDOWN_CADENCE: Duration = Duration::from_secs(1);

/// Shortest period a timer loop accepts; `tokio::time::interval` rejects zero
pub const MIN_TICK_PERIOD: Duration = Duration::from_millis(1);

/// How long binaries wait for background loops after Ctrl+C
pub const SHUTDOWN_GRACE_PERIOD: Duration = Duration::from_secs(5);

//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every default can be overridden through the environment (or a `.env` file).

/// Sliding window length used by the feature extractor
pub const DEFAULT_WINDOW_SIZE: usize = 24;

/// Expected outlier share in detector training data
pub const DEFAULT_CONTAMINATION: f64 = 0.1;

/// Anomaly log capacity (oldest entries are evicted first)
pub const DEFAULT_MAX_LOG_ENTRIES: usize = 1000;

/// Window used by the "recent activity" flag of the anomaly log (seconds)
pub const DEFAULT_RECENT_WINDOW_SECS: i64 = 600;

/// Seed shared by the learning components
pub const DEFAULT_SEED: u64 = 42;

/// Default sensor receiver URL
pub const DEFAULT_RECEIVER_URL: &str = "http://localhost:5001";

/// Poll interval of the live monitor (seconds)
pub const DEFAULT_POLL_INTERVAL: u64 = 2;

/// Timeout for receiver requests (seconds)
pub const DEFAULT_REQUEST_TIMEOUT: u64 = 2;

/// Records requested from the receiver per poll
pub const DEFAULT_FETCH_LIMIT: usize = 100;

/// Per-parameter live history capacity
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Receiver record cache capacity
pub const DEFAULT_CACHE_CAPACITY: usize = 1000;

/// Mains voltage used when deriving power from current
pub const DEFAULT_VOLTAGE: f64 = 220.0;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "ENMOS";

// ============================================
// Helper functions to read from env with fallback
// ============================================

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get window size from environment or use default
pub fn get_window_size() -> usize {
    env_parse("ENMOS_WINDOW_SIZE", DEFAULT_WINDOW_SIZE)
}

/// Get contamination prior from environment or use default
pub fn get_contamination() -> f64 {
    env_parse("ENMOS_CONTAMINATION", DEFAULT_CONTAMINATION)
}

/// Get anomaly log capacity from environment or use default
pub fn get_max_log_entries() -> usize {
    env_parse("ENMOS_MAX_LOG_ENTRIES", DEFAULT_MAX_LOG_ENTRIES)
}

/// Get model seed from environment or use default
pub fn get_seed() -> u64 {
    env_parse("ENMOS_SEED", DEFAULT_SEED)
}

/// Get receiver URL from environment or use default
pub fn get_receiver_url() -> String {
    std::env::var("ENMOS_RECEIVER_URL")
        .unwrap_or_else(|_| DEFAULT_RECEIVER_URL.to_string())
}

/// Get poll interval from environment or use default
pub fn get_poll_interval() -> u64 {
    env_parse("ENMOS_POLL_INTERVAL", DEFAULT_POLL_INTERVAL)
}

/// Get request timeout from environment or use default
pub fn get_request_timeout() -> u64 {
    env_parse("ENMOS_REQUEST_TIMEOUT", DEFAULT_REQUEST_TIMEOUT)
}

/// Check if receiver polling is enabled
pub fn is_receiver_enabled() -> bool {
    std::env::var("ENMOS_RECEIVER_ENABLED")
        .map(|s| s.to_lowercase() != "false" && s != "0")
        .unwrap_or(true)
}

//! Stage timeouts, retry budget, and the duplicate-submission window, as
//! plain structs with literal defaults, overridable via
//! `DDC_*` environment variables per the ambient configuration convention.

use std::time::Duration;

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Transient errors are republished up to this many times.
    pub retry_budget: u32,
    pub render_timeout: Duration,
    pub diff_timeout: Duration,
    pub summary_timeout: Duration,
    /// Base delay for exponential backoff between retries: `base * 2^attempt`.
    pub backoff_base: Duration,
    /// Window within which a duplicate `(old_hash, new_hash)` submission
    /// returns the existing job id rather than creating a new one.
    pub duplicate_window: chrono::Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            retry_budget: env_u32("DDC_RETRY_BUDGET", 3),
            render_timeout: Duration::from_secs(env_u64("DDC_RENDER_TIMEOUT_SECS", 120)),
            diff_timeout: Duration::from_secs(env_u64("DDC_DIFF_TIMEOUT_SECS", 300)),
            summary_timeout: Duration::from_secs(env_u64("DDC_SUMMARY_TIMEOUT_SECS", 180)),
            backoff_base: Duration::from_secs(env_u64("DDC_BACKOFF_BASE_SECS", 2)),
            duplicate_window: chrono::Duration::seconds(
                env_u64("DDC_DUPLICATE_WINDOW_SECS", 24 * 3600) as i64,
            ),
        }
    }
}

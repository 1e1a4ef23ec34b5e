//! # Controller Configuration
//!
//! Controller-level settings loaded from environment variables.

use std::time::Duration;

/// Controller-level configuration
///
/// All settings have sensible defaults and can be overridden via environment variables.
/// Environment variables are populated from a ConfigMap using `envFrom` in the deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerConfig {
    /// HTTP port for metrics and health probes
    pub metrics_port: u16,
    /// How long to wait for the HTTP server to bind (seconds)
    pub server_startup_timeout_secs: u64,
    /// Readiness poll interval while waiting for the HTTP server (milliseconds)
    pub server_poll_interval_ms: u64,
    /// Requeue interval after a converged pass (seconds)
    /// Drift introduced outside the controller is picked up at this rate
    pub poll_interval_secs: u64,
    /// Requeue interval after a successful create (seconds)
    pub creation_confirm_requeue_secs: u64,
    /// Requeue interval after the provider rejected a request (seconds)
    pub provider_error_requeue_secs: u64,
    /// Fibonacci backoff lower bound for transient errors (seconds)
    pub backoff_min_secs: u64,
    /// Fibonacci backoff upper bound for transient errors (seconds)
    pub backoff_max_secs: u64,
    /// Timeout of a single provider API call (seconds)
    pub provider_call_timeout_secs: u64,
    /// Watch stream restart delay after unknown errors (seconds)
    pub watch_restart_delay_secs: u64,
    /// Watch stream restart delay after stream ends (seconds)
    pub watch_restart_delay_after_end_secs: u64,
    /// Initial backoff after a throttled watch stream (milliseconds)
    pub watch_backoff_start_ms: u64,
    /// Maximum backoff after a throttled watch stream (milliseconds)
    pub watch_backoff_max_ms: u64,
    /// Maximum concurrent reconciliations per kind
    pub max_concurrent_reconciliations: u16,
    /// Log format (json, text)
    pub log_format: String,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: DEFAULT_METRICS_PORT,
            server_startup_timeout_secs: DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            server_poll_interval_ms: DEFAULT_SERVER_POLL_INTERVAL_MS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            creation_confirm_requeue_secs: DEFAULT_CREATION_CONFIRM_REQUEUE_SECS,
            provider_error_requeue_secs: DEFAULT_PROVIDER_ERROR_REQUEUE_SECS,
            backoff_min_secs: DEFAULT_BACKOFF_MIN_SECS,
            backoff_max_secs: DEFAULT_BACKOFF_MAX_SECS,
            provider_call_timeout_secs: DEFAULT_PROVIDER_CALL_TIMEOUT_SECS,
            watch_restart_delay_secs: DEFAULT_WATCH_RESTART_DELAY_SECS,
            watch_restart_delay_after_end_secs: DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            watch_backoff_start_ms: DEFAULT_WATCH_BACKOFF_START_MS,
            watch_backoff_max_ms: DEFAULT_WATCH_BACKOFF_MAX_MS,
            max_concurrent_reconciliations: DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            log_format: "json".to_string(),
        }
    }
}

impl ControllerConfig {
    /// Load configuration from environment variables with defaults
    #[must_use]
    pub fn from_env() -> Self {
        use crate::constants::*;
        Self {
            metrics_port: env_var_or_default("METRICS_PORT", DEFAULT_METRICS_PORT),
            server_startup_timeout_secs: env_var_or_default(
                "SERVER_STARTUP_TIMEOUT_SECS",
                DEFAULT_SERVER_STARTUP_TIMEOUT_SECS,
            ),
            server_poll_interval_ms: env_var_or_default(
                "SERVER_POLL_INTERVAL_MS",
                DEFAULT_SERVER_POLL_INTERVAL_MS,
            ),
            poll_interval_secs: env_var_or_default(
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            ),
            creation_confirm_requeue_secs: env_var_or_default(
                "CREATION_CONFIRM_REQUEUE_SECS",
                DEFAULT_CREATION_CONFIRM_REQUEUE_SECS,
            ),
            provider_error_requeue_secs: env_var_or_default(
                "PROVIDER_ERROR_REQUEUE_SECS",
                DEFAULT_PROVIDER_ERROR_REQUEUE_SECS,
            ),
            backoff_min_secs: env_var_or_default("BACKOFF_MIN_SECS", DEFAULT_BACKOFF_MIN_SECS),
            backoff_max_secs: env_var_or_default("BACKOFF_MAX_SECS", DEFAULT_BACKOFF_MAX_SECS),
            provider_call_timeout_secs: env_var_or_default(
                "PROVIDER_CALL_TIMEOUT_SECS",
                DEFAULT_PROVIDER_CALL_TIMEOUT_SECS,
            ),
            watch_restart_delay_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_SECS",
                DEFAULT_WATCH_RESTART_DELAY_SECS,
            ),
            watch_restart_delay_after_end_secs: env_var_or_default(
                "WATCH_RESTART_DELAY_AFTER_END_SECS",
                DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS,
            ),
            watch_backoff_start_ms: env_var_or_default(
                "WATCH_BACKOFF_START_MS",
                DEFAULT_WATCH_BACKOFF_START_MS,
            ),
            watch_backoff_max_ms: env_var_or_default(
                "WATCH_BACKOFF_MAX_MS",
                DEFAULT_WATCH_BACKOFF_MAX_MS,
            ),
            max_concurrent_reconciliations: env_var_or_default(
                "MAX_CONCURRENT_RECONCILIATIONS",
                DEFAULT_MAX_CONCURRENT_RECONCILIATIONS,
            ),
            log_format: env_var_or_default_str("LOG_FORMAT", "json"),
        }
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    #[must_use]
    pub fn creation_confirm_requeue(&self) -> Duration {
        Duration::from_secs(self.creation_confirm_requeue_secs)
    }

    #[must_use]
    pub fn provider_error_requeue(&self) -> Duration {
        Duration::from_secs(self.provider_error_requeue_secs)
    }

    #[must_use]
    pub fn provider_call_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_call_timeout_secs)
    }

    /// Get watch restart delay duration
    #[must_use]
    pub fn watch_restart_delay_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_secs)
    }

    /// Get watch restart delay after end duration
    #[must_use]
    pub fn watch_restart_delay_after_end_duration(&self) -> Duration {
        Duration::from_secs(self.watch_restart_delay_after_end_secs)
    }
}

/// Read environment variable or return default value
fn env_var_or_default<T: std::str::FromStr>(key: &str, default: T) -> T
where
    <T as std::str::FromStr>::Err: std::fmt::Debug,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Read environment variable as string or return default
fn env_var_or_default_str(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

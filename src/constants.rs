//! # Constants
//!
//! Shared constants used throughout the controller.
//!
//! These values represent reasonable defaults and can be overridden via
//! configuration or environment variables where applicable.

/// Default HTTP server port for metrics and health probes
pub const DEFAULT_METRICS_PORT: u16 = 5000;

/// Default HTTP server startup timeout (how long to wait for server to be ready)
pub const DEFAULT_SERVER_STARTUP_TIMEOUT_SECS: u64 = 10;

/// Default HTTP server readiness poll interval
pub const DEFAULT_SERVER_POLL_INTERVAL_MS: u64 = 50;

/// Requeue after a pass that found the external resource converged (seconds)
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Requeue after a successful create, to confirm the resource became available (seconds)
pub const DEFAULT_CREATION_CONFIRM_REQUEUE_SECS: u64 = 10;

/// Requeue after the provider rejected a request (seconds)
/// Rejections need a spec change or outside action, so they are not retried fast
pub const DEFAULT_PROVIDER_ERROR_REQUEUE_SECS: u64 = 300;

/// Fibonacci backoff lower bound for transient errors (seconds)
pub const DEFAULT_BACKOFF_MIN_SECS: u64 = 5;

/// Fibonacci backoff upper bound for transient errors (seconds)
pub const DEFAULT_BACKOFF_MAX_SECS: u64 = 300;

/// Timeout of a single provider API call (seconds)
pub const DEFAULT_PROVIDER_CALL_TIMEOUT_SECS: u64 = 30;

/// Maximum number of records reconciled concurrently per kind
pub const DEFAULT_MAX_CONCURRENT_RECONCILIATIONS: u16 = 10;

/// Default delay before restarting watch stream after unknown errors (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_SECS: u64 = 5;

/// Default delay before restarting watch stream after it ends (seconds)
pub const DEFAULT_WATCH_RESTART_DELAY_AFTER_END_SECS: u64 = 1;

/// Initial backoff after a throttled watch stream (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_START_MS: u64 = 2000;

/// Maximum backoff after a throttled watch stream (milliseconds)
pub const DEFAULT_WATCH_BACKOFF_MAX_MS: u64 = 30000;

/// Finalizer guarding deletion of managed records
pub const FINALIZER_NAME: &str = "finalizer.managedresource.alibaba.crossplane.io";

/// Finalizer holding a ProviderConfig while managed records use it
pub const IN_USE_FINALIZER: &str = "in-use.alibaba.crossplane.io";

/// Field manager used for server-side applies
pub const FIELD_MANAGER: &str = "alibaba-provider-controller";

/// Secret key holding the AccessKey ID
pub const ACCESS_KEY_ID_KEY: &str = "accessKeyId";

/// Secret key holding the AccessKey secret
pub const ACCESS_KEY_SECRET_KEY: &str = "accessKeySecret";

/// Base domain of every Alibaba Cloud service endpoint
pub const DOMAIN: &str = "aliyuncs.com";

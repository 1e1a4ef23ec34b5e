//! # Error Policy
//!
//! Requeue scheduling for failed reconciliations and classification of
//! watch stream errors.

use crate::config::ControllerConfig;
use crate::controller::reconciler::types::record_key;
use crate::controller::reconciler::{
    ErrorClass, ProviderConfigContext, ProviderConfigError, ReconcileContext, ReconcilerError,
};
use crate::crd::{Managed, ProviderConfig};
use crate::observability;
use kube::ResourceExt;
use kube_runtime::controller::Action;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Decide when a record whose pass failed is retried
///
/// - configuration errors wait for the record or its provider config to change
/// - transient errors retry with per-record Fibonacci backoff
/// - provider errors retry at a fixed, slow interval
pub fn handle_reconciliation_error<R: Managed>(
    record: Arc<R>,
    error: &ReconcilerError,
    ctx: Arc<ReconcileContext<R>>,
) -> Action {
    let kind = R::kind(&());
    let name = record.name_any();
    let class = error.class();

    let error_span = tracing::span!(
        tracing::Level::ERROR,
        "controller.watch.reconciliation_error",
        resource.kind = %kind,
        resource.name = name.as_str(),
        error.class = class.as_str(),
        error = %error
    );
    let _error_guard = error_span.enter();

    error!("Reconciliation error for {}/{}: {}", kind, name, error);
    observability::metrics::increment_reconciliation_errors(&kind, class.as_str());

    let (action, error_count) = ctx.requeue.on_error(&record_key(record.as_ref()), class);
    match class {
        ErrorClass::Configuration => {
            info!("Waiting for the record or its provider config to change before retrying");
            observability::metrics::increment_requeues_total("await-change");
        }
        ErrorClass::Transient => {
            info!(
                "Retrying with Fibonacci backoff: {:?} (error count: {})",
                action, error_count
            );
            observability::metrics::increment_requeues_total("error-backoff");
        }
        ErrorClass::Provider => {
            info!(
                "Provider rejected the request, retrying in {}s",
                ctx.config.provider_error_requeue_secs
            );
            observability::metrics::increment_requeues_total("provider-error");
        }
    }
    action
}

/// Decide when a `ProviderConfig` whose deletion is blocked is checked again
///
/// Released usages re-trigger the config through its usage watch, so the
/// requeue only bounds how long a missed event can hold it.
pub fn handle_provider_config_error(
    provider_config: Arc<ProviderConfig>,
    error: &ProviderConfigError,
    ctx: Arc<ProviderConfigContext>,
) -> Action {
    let name = provider_config.name_any();
    match error {
        ProviderConfigError::InUse { .. } => info!("Deletion of {} deferred: {}", name, error),
        _ => error!("Reconciliation error for ProviderConfig/{}: {}", name, error),
    }
    observability::metrics::increment_reconciliation_errors(
        "ProviderConfig",
        provider_config_error_class(error),
    );
    provider_config_action(error, &ctx.config)
}

fn provider_config_error_class(error: &ProviderConfigError) -> &'static str {
    match error {
        ProviderConfigError::InUse { .. } => "in-use",
        ProviderConfigError::ListUsages(_) | ProviderConfigError::Finalizer(_) => {
            ErrorClass::Transient.as_str()
        }
    }
}

fn provider_config_action(error: &ProviderConfigError, config: &ControllerConfig) -> Action {
    match error {
        ProviderConfigError::InUse { .. } => Action::requeue(config.poll_interval()),
        ProviderConfigError::ListUsages(_) | ProviderConfigError::Finalizer(_) => {
            Action::requeue(Duration::from_secs(config.backoff_min_secs))
        }
    }
}

/// Handle watch stream errors with appropriate classification and backoff
///
/// Returns `None` to filter out the error (allow restart) or `Some(())` to continue.
pub async fn handle_watch_stream_error(
    error_string: &str,
    backoff: &Arc<AtomicU64>,
    max_backoff_ms: u64,
    watch_restart_delay: Duration,
) -> Option<()> {
    let error_span = tracing::span!(
        tracing::Level::WARN,
        "controller.watch.error",
        error = %error_string
    );
    let _error_guard = error_span.enter();

    match WatchErrorKind::classify(error_string) {
        WatchErrorKind::Unauthorized => {
            error!("Watch authentication failed (401 Unauthorized): RBAC may have been revoked or the token expired");
            warn!("Waiting {:?} before retrying watch", watch_restart_delay);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
        WatchErrorKind::Expired => {
            warn!("Watch resource version expired (410), watch will restart");
            None
        }
        WatchErrorKind::Throttled => {
            let current = backoff.load(Ordering::Relaxed);
            warn!(
                "API server storage reinitializing (429), backing off for {}ms before restart",
                current
            );
            tokio::time::sleep(Duration::from_millis(current)).await;
            backoff.store(current.saturating_mul(2).min(max_backoff_ms), Ordering::Relaxed);
            None
        }
        WatchErrorKind::NotFound => {
            warn!(
                "Resource not found (404), normal if the record was deleted; a missing CRD needs `crdgen | kubectl apply -f -`. Error: {}",
                error_string
            );
            Some(())
        }
        WatchErrorKind::Other => {
            error!("Controller stream error: {}", error_string);
            tokio::time::sleep(watch_restart_delay).await;
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatchErrorKind {
    Unauthorized,
    Expired,
    Throttled,
    NotFound,
    Other,
}

impl WatchErrorKind {
    fn classify(error_string: &str) -> Self {
        // 404 first: a plain-text 404 body surfaces as a serde error mentioning WatchFailed
        let is_not_found = error_string.contains("ObjectNotFound")
            || error_string.contains("404")
            || error_string.contains("not found");
        if (error_string.contains("401") || error_string.contains("Unauthorized")) && !is_not_found
        {
            WatchErrorKind::Unauthorized
        } else if error_string.contains("410")
            || error_string.contains("too old resource version")
            || error_string.contains("Expired")
            || error_string.contains("Gone")
        {
            WatchErrorKind::Expired
        } else if error_string.contains("429")
            || error_string.contains("storage is (re)initializing")
            || error_string.contains("TooManyRequests")
        {
            WatchErrorKind::Throttled
        } else if is_not_found {
            WatchErrorKind::NotFound
        } else {
            WatchErrorKind::Other
        }
    }
}

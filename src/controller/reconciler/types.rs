//! # Types
//!
//! Core types for the reconciler.

use super::credentials::ConnectError;
use super::managed::ManagedReconciler;
use super::store::StoreError;
use crate::config::SharedControllerConfig;
use crate::controller::backoff::FibonacciBackoff;
use crate::crd::Managed;
use crate::provider::ProviderError;
use kube::Client;
use kube_runtime::controller::Action;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::warn;

/// Failure of one reconciliation pass, prefixed with the phase it failed in
#[derive(Debug, Error)]
pub enum ReconcilerError {
    #[error("connect: {0}")]
    Connect(#[from] ConnectError),

    #[error("observe: cannot observe external resource: {0}")]
    Observe(#[source] ProviderError),

    #[error("create: cannot create external resource: {0}")]
    Create(#[source] ProviderError),

    #[error("update: cannot update external resource: {0}")]
    Update(#[source] ProviderError),

    #[error("delete: cannot delete external resource: {0}")]
    Delete(#[source] ProviderError),

    #[error("observe: cannot publish connection details: {0}")]
    PublishConnection(#[source] StoreError),

    #[error("delete: cannot release provider config usage: {0}")]
    ReleaseUsage(#[source] StoreError),

    #[error("cannot update status: {0}")]
    Status(String),

    #[error("finalizer: {0}")]
    Finalizer(String),
}

/// How the error policy treats a failed pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The record or its provider config must change; wait for that
    Configuration,
    /// Infrastructure hiccup; retry with backoff
    Transient,
    /// The provider refused the request; report and requeue slowly
    Provider,
}

impl ErrorClass {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Configuration => "configuration",
            ErrorClass::Transient => "transient",
            ErrorClass::Provider => "provider",
        }
    }

    fn of_provider(error: &ProviderError) -> Self {
        if error.is_retryable() {
            ErrorClass::Transient
        } else {
            ErrorClass::Provider
        }
    }
}

impl ReconcilerError {
    #[must_use]
    pub fn class(&self) -> ErrorClass {
        match self {
            ReconcilerError::Connect(error) => match error {
                ConnectError::NoProviderConfig
                | ConnectError::UnsupportedCredentialsSource(_)
                | ConnectError::NoConnectionSecret
                | ConnectError::MissingCredentialKey { .. }
                | ConnectError::Endpoint(_) => ErrorClass::Configuration,
                // A missing ProviderConfig re-triggers the record once created
                ConnectError::GetProviderConfig(e) if e.is_not_found() => {
                    ErrorClass::Configuration
                }
                ConnectError::GetProviderConfig(_)
                | ConnectError::TrackUsage(_)
                | ConnectError::GetConnectionSecret(_) => ErrorClass::Transient,
                ConnectError::Authentication(e) => ErrorClass::of_provider(e),
            },
            ReconcilerError::Observe(e)
            | ReconcilerError::Create(e)
            | ReconcilerError::Update(e)
            | ReconcilerError::Delete(e) => ErrorClass::of_provider(e),
            ReconcilerError::PublishConnection(_)
            | ReconcilerError::ReleaseUsage(_)
            | ReconcilerError::Status(_)
            | ReconcilerError::Finalizer(_) => ErrorClass::Transient,
        }
    }
}

/// What a successful pass did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassOutcome {
    Created,
    Updated,
    UpToDate,
    Deleted,
    Orphaned,
}

impl PassOutcome {
    /// Note mirrored into `status.atProvider.message`
    #[must_use]
    pub fn note(&self) -> &'static str {
        match self {
            PassOutcome::Created => "external resource created, waiting for it to become available",
            PassOutcome::Updated => "external resource updated",
            PassOutcome::UpToDate => "external resource is up to date",
            PassOutcome::Deleted => "external resource deleted",
            PassOutcome::Orphaned => "external resource orphaned",
        }
    }
}

/// Backoff state for a specific resource
/// Tracks error count and backoff calculator for progressive retries
#[derive(Debug, Clone)]
pub struct BackoffState {
    pub backoff: FibonacciBackoff,
    pub error_count: u32,
}

impl BackoffState {
    #[must_use]
    pub fn new(min_secs: u64, max_secs: u64) -> Self {
        Self {
            backoff: FibonacciBackoff::new(min_secs, max_secs),
            error_count: 0,
        }
    }

    pub fn increment_error(&mut self) {
        self.error_count += 1;
    }

    pub fn reset(&mut self) {
        self.error_count = 0;
        self.backoff.reset();
    }
}

/// Requeue decisions for failed and successful passes
///
/// Backoff state is kept per record so one failing record does not slow
/// down the others.
#[derive(Debug)]
pub struct RequeuePolicy {
    config: SharedControllerConfig,
    backoff_states: Arc<Mutex<HashMap<String, BackoffState>>>,
}

impl RequeuePolicy {
    #[must_use]
    pub fn new(config: SharedControllerConfig) -> Self {
        Self {
            config,
            backoff_states: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Action for a failed pass of the record identified by `key`
    ///
    /// Returns the action together with the error count of the record.
    pub fn on_error(&self, key: &str, class: ErrorClass) -> (Action, u32) {
        match class {
            ErrorClass::Configuration => (Action::await_change(), 0),
            ErrorClass::Provider => (Action::requeue(self.config.provider_error_requeue()), 0),
            ErrorClass::Transient => match self.backoff_states.lock() {
                Ok(mut states) => {
                    let state = states.entry(key.to_string()).or_insert_with(|| {
                        BackoffState::new(self.config.backoff_min_secs, self.config.backoff_max_secs)
                    });
                    state.increment_error();
                    (
                        Action::requeue(state.backoff.next_backoff()),
                        state.error_count,
                    )
                }
                Err(e) => {
                    warn!("Failed to lock backoff states: {}, using minimum backoff", e);
                    (
                        Action::requeue(std::time::Duration::from_secs(
                            self.config.backoff_min_secs,
                        )),
                        0,
                    )
                }
            },
        }
    }

    /// Forget the failures of `key` after a successful pass
    pub fn reset(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            if let Some(state) = states.get_mut(key) {
                state.reset();
            }
        }
    }

    /// Drop the backoff state of `key` once its record is gone
    pub fn forget(&self, key: &str) {
        if let Ok(mut states) = self.backoff_states.lock() {
            states.remove(key);
        }
    }
}

/// Shared state handed to every reconciliation of one kind
pub struct ReconcileContext<R: Managed> {
    pub client: Client,
    pub reconciler: ManagedReconciler<R>,
    pub config: SharedControllerConfig,
    pub requeue: RequeuePolicy,
}

impl<R: Managed> std::fmt::Debug for ReconcileContext<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcileContext")
            .field("reconciler", &self.reconciler)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Backoff key of a record
pub(crate) fn record_key<R: Managed>(record: &R) -> String {
    format!("{}/{}", R::kind(&()), kube::ResourceExt::name_any(record))
}

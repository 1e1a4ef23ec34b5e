//! # Managed Reconciler
//!
//! One reconciliation pass over a managed record:
//!
//! ```text
//! Connect -> Observe -> Create | Update | nothing -> report status
//! ```
//!
//! Deletion is a separate entry point. Observe always runs before a
//! mutating call, so a repeated pass never creates twice.
//!
//! Every provider call races the shutdown token and a per-call timeout.
//! The pass itself only mutates the record in memory; persisting the status
//! is the caller's job.

use super::credentials::Connector;
use super::status;
use super::store::ConnectionSecretWriter;
use super::types::{PassOutcome, ReconcilerError};
use crate::crd::{
    DeletionPolicy, HasConditions, HasConnectionSecretRef, HasDeletionPolicy, Managed,
};
use crate::observability;
use crate::provider::{ExternalClient, ExternalState, ProviderError};
use kube::Resource;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct ManagedReconciler<R: Managed> {
    connector: Connector<R>,
    connection_writer: Arc<dyn ConnectionSecretWriter>,
    cancel: CancellationToken,
    call_timeout: Duration,
}

impl<R: Managed> std::fmt::Debug for ManagedReconciler<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedReconciler")
            .field("connector", &self.connector)
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl<R: Managed> ManagedReconciler<R> {
    #[must_use]
    pub fn new(
        connector: Connector<R>,
        connection_writer: Arc<dyn ConnectionSecretWriter>,
        cancel: CancellationToken,
        call_timeout: Duration,
    ) -> Self {
        Self {
            connector,
            connection_writer,
            cancel,
            call_timeout,
        }
    }

    /// Drive the external resource towards the record's desired state
    ///
    /// Conditions and message are updated on `record` whatever the outcome.
    pub async fn reconcile(&self, record: &mut R) -> Result<PassOutcome, ReconcilerError> {
        let result = self.converge(record).await;
        status::report(record, &result);
        result
    }

    /// Delete or orphan the external resource of a record being deleted
    pub async fn delete(&self, record: &mut R) -> Result<PassOutcome, ReconcilerError> {
        record.set_condition(status::deleting());
        let result = self.remove(record).await;
        status::report(record, &result);
        result
    }

    async fn converge(&self, record: &mut R) -> Result<PassOutcome, ReconcilerError> {
        let client = self.connector.connect(record).await?;

        let observed = match self.call("observe", client.observe(record)).await {
            Ok(observed) => observed,
            Err(e) => {
                record.set_condition(status::unavailable());
                return Err(ReconcilerError::Observe(e));
            }
        };

        let (observation, connection_details) = match observed {
            ExternalState::Absent => {
                info!(
                    external_name = %record.external_name(),
                    "External resource does not exist, creating"
                );
                self.call("create", client.create(record))
                    .await
                    .map_err(ReconcilerError::Create)?;
                record.set_condition(status::creating());
                return Ok(PassOutcome::Created);
            }
            ExternalState::Present {
                observation,
                connection_details,
            } => (observation, connection_details),
        };

        record.set_at_provider(observation.clone());
        record.set_condition(status::available());

        if let Some(secret_ref) = record.write_connection_secret_to_reference() {
            if !connection_details.is_empty() {
                self.connection_writer
                    .publish(secret_ref, record.controller_owner_ref(&()), &connection_details)
                    .await
                    .map_err(ReconcilerError::PublishConnection)?;
            }
        }

        let drifted = record.drift(&observation);
        if drifted.is_empty() {
            debug!(external_name = %record.external_name(), "External resource is up to date");
            return Ok(PassOutcome::UpToDate);
        }

        info!(
            external_name = %record.external_name(),
            fields = ?drifted,
            "External resource drifted, updating"
        );
        self.call("update", client.update(record, &observation))
            .await
            .map_err(ReconcilerError::Update)?;
        Ok(PassOutcome::Updated)
    }

    async fn remove(&self, record: &R) -> Result<PassOutcome, ReconcilerError> {
        if record.deletion_policy() == DeletionPolicy::Orphan {
            info!(
                external_name = %record.external_name(),
                "Deletion policy is Orphan, leaving external resource in place"
            );
            self.release(record).await?;
            return Ok(PassOutcome::Orphaned);
        }

        let client = self.connector.connect(record).await?;
        self.delete_external(client.as_ref(), record).await?;
        self.release(record).await?;
        Ok(PassOutcome::Deleted)
    }

    async fn delete_external(
        &self,
        client: &dyn ExternalClient<R>,
        record: &R,
    ) -> Result<(), ReconcilerError> {
        let observed = self
            .call("observe", client.observe(record))
            .await
            .map_err(ReconcilerError::Observe)?;
        if matches!(observed, ExternalState::Absent) {
            debug!(external_name = %record.external_name(), "External resource already gone");
            return Ok(());
        }

        info!(external_name = %record.external_name(), "Deleting external resource");
        match self.call("delete", client.delete(record)).await {
            Ok(()) => Ok(()),
            Err(e) if e.is_not_found() => Ok(()),
            Err(e) => Err(ReconcilerError::Delete(e)),
        }
    }

    async fn release(&self, record: &R) -> Result<(), ReconcilerError> {
        self.connector
            .release(record)
            .await
            .map_err(ReconcilerError::ReleaseUsage)
    }

    /// Run one provider call under the shutdown token and the call timeout
    async fn call<T, F>(&self, operation: &'static str, future: F) -> Result<T, ProviderError>
    where
        F: Future<Output = Result<T, ProviderError>>,
    {
        let kind = R::kind(&());
        observability::metrics::increment_external_operations(&kind, operation);
        let start = Instant::now();

        let result = tokio::select! {
            () = self.cancel.cancelled() => Err(ProviderError::Cancelled),
            outcome = tokio::time::timeout(self.call_timeout, future) => {
                outcome.unwrap_or(Err(ProviderError::Timeout(self.call_timeout)))
            }
        };

        observability::metrics::observe_external_operation_duration(
            &kind,
            operation,
            start.elapsed().as_secs_f64(),
        );
        if let Err(e) = &result {
            if !e.is_not_found() {
                warn!(operation, error = %e, "Provider call failed");
                observability::metrics::increment_external_operation_errors(&kind, operation);
            }
        }
        result
    }
}


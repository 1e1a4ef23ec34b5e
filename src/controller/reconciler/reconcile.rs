//! # Reconcile
//!
//! Entry point handed to the kube-runtime controller. Wraps the managed pass
//! in the finalizer protocol, persists the status it produced and picks the
//! requeue interval.

use super::types::{record_key, PassOutcome, ReconcileContext, ReconcilerError};
use crate::constants::FINALIZER_NAME;
use crate::crd::Managed;
use crate::observability;
use kube::api::{Api, Patch, PatchParams};
use kube::ResourceExt;
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn, Instrument};

/// Reconcile one managed record
pub async fn reconcile<R: Managed>(
    record: Arc<R>,
    ctx: Arc<ReconcileContext<R>>,
) -> Result<Action, ReconcilerError> {
    let kind = R::kind(&()).to_string();
    let name = record.name_any();
    let span = tracing::info_span!(
        "reconcile",
        resource.kind = kind.as_str(),
        resource.name = name.as_str()
    );

    async move {
        let start = Instant::now();
        observability::metrics::increment_reconciliations(&kind);

        let api: Api<R> = Api::all(ctx.client.clone());
        let (api_ref, ctx_ref) = (&api, ctx.as_ref());
        let result = finalizer(&api, FINALIZER_NAME, record, move |event| async move {
            match event {
                Event::Apply(record) => apply(api_ref, ctx_ref, &record).await,
                Event::Cleanup(record) => cleanup(api_ref, ctx_ref, &record).await,
            }
        })
        .await
        .map_err(|e| match e {
            FinalizerError::ApplyFailed(e) | FinalizerError::CleanupFailed(e) => e,
            other => ReconcilerError::Finalizer(other.to_string()),
        });

        observability::metrics::observe_reconciliation_duration(
            &kind,
            start.elapsed().as_secs_f64(),
        );
        result
    }
    .instrument(span)
    .await
}

async fn apply<R: Managed>(
    api: &Api<R>,
    ctx: &ReconcileContext<R>,
    record: &R,
) -> Result<Action, ReconcilerError> {
    let mut record = record.clone();
    let result = ctx.reconciler.reconcile(&mut record).await;
    let persisted = patch_status(api, &record).await;

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(status_error) = persisted {
                warn!("Failed to persist status after failed pass: {}", status_error);
            }
            return Err(e);
        }
    };
    persisted?;
    ctx.requeue.reset(&record_key(&record));

    let requeue_after = if outcome == PassOutcome::Created {
        ctx.config.creation_confirm_requeue()
    } else {
        ctx.config.poll_interval()
    };
    info!(outcome = ?outcome, requeue_after = ?requeue_after, "Reconciliation complete");
    observability::metrics::increment_requeues_total("poll");
    Ok(Action::requeue(requeue_after))
}

async fn cleanup<R: Managed>(
    api: &Api<R>,
    ctx: &ReconcileContext<R>,
    record: &R,
) -> Result<Action, ReconcilerError> {
    let mut record = record.clone();
    match ctx.reconciler.delete(&mut record).await {
        Ok(outcome) => {
            info!(outcome = ?outcome, "External resource released");
            ctx.requeue.forget(&record_key(&record));
            Ok(Action::await_change())
        }
        Err(e) => {
            if let Err(status_error) = patch_status(api, &record).await {
                warn!("Failed to persist status after failed delete: {}", status_error);
            }
            Err(e)
        }
    }
}

/// Write the record's status with a JSON merge patch
async fn patch_status<R: Managed>(api: &Api<R>, record: &R) -> Result<(), ReconcilerError> {
    let value =
        serde_json::to_value(record).map_err(|e| ReconcilerError::Status(e.to_string()))?;
    let status = value.get("status").cloned().unwrap_or_default();
    let patch = serde_json::json!({ "status": status });

    api.patch_status(&record.name_any(), &PatchParams::default(), &Patch::Merge(&patch))
        .await
        .map(|_| ())
        .map_err(|e| ReconcilerError::Status(e.to_string()))
}

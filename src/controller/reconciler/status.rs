//! # Status Reporter
//!
//! Condition constructors and the bookkeeping that turns the outcome of a
//! pass into `Ready` / `Synced` conditions and `status.atProvider.message`.
//!
//! | Condition | Status | Reason |
//! |-----------|--------|--------|
//! | Ready     | True   | `Available` |
//! | Ready     | False  | `Creating`, `Deleting`, `Unavailable` |
//! | Synced    | True   | `ReconcileSuccess` |
//! | Synced    | False  | `ReconcileError` |

use super::types::{PassOutcome, ReconcilerError};
use crate::crd::{Condition, ConditionType, HasConditions, Managed};

fn condition(
    condition_type: ConditionType,
    is_true: bool,
    reason: &str,
    message: Option<String>,
) -> Condition {
    Condition {
        r#type: condition_type.as_str().to_string(),
        status: if is_true { "True" } else { "False" }.to_string(),
        last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
        reason: Some(reason.to_string()),
        message,
    }
}

/// The external resource exists and is usable
#[must_use]
pub fn available() -> Condition {
    condition(ConditionType::Ready, true, "Available", None)
}

/// Create was requested; a later observe has to confirm it
#[must_use]
pub fn creating() -> Condition {
    condition(ConditionType::Ready, false, "Creating", None)
}

#[must_use]
pub fn deleting() -> Condition {
    condition(ConditionType::Ready, false, "Deleting", None)
}

#[must_use]
pub fn unavailable() -> Condition {
    condition(ConditionType::Ready, false, "Unavailable", None)
}

#[must_use]
pub fn reconcile_success() -> Condition {
    condition(ConditionType::Synced, true, "ReconcileSuccess", None)
}

#[must_use]
pub fn reconcile_error(error: &ReconcilerError) -> Condition {
    condition(
        ConditionType::Synced,
        false,
        "ReconcileError",
        Some(error.to_string()),
    )
}

/// Record the outcome of a pass on the record
///
/// Writes exactly one `Synced` condition and the message. The `Ready`
/// condition is set by the pass itself, where the observation is known.
pub fn report<R: Managed>(record: &mut R, result: &Result<PassOutcome, ReconcilerError>) {
    match result {
        Ok(outcome) => {
            record.set_condition(reconcile_success());
            record.set_message(Some(outcome.note().to_string()));
        }
        Err(error) => {
            record.set_condition(reconcile_error(error));
            record.set_message(Some(error.to_string()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{Bucket, ManagedParts, OssParameters, OssSpec, ResourceSpec, OSS};
    use crate::provider::ProviderError;

    fn record() -> OSS {
        OSS::new(
            "b1",
            OssSpec {
                resource: ResourceSpec::default(),
                for_provider: OssParameters {
                    bucket: Bucket {
                        name: "b1".to_string(),
                        ..Bucket::default()
                    },
                },
            },
        )
    }

    #[test]
    fn test_success_sets_synced_and_note() {
        let mut record = record();
        report(&mut record, &Ok(PassOutcome::UpToDate));

        let synced = record.condition(ConditionType::Synced).unwrap();
        assert!(synced.is_true());
        assert_eq!(synced.reason.as_deref(), Some("ReconcileSuccess"));
        assert_eq!(record.message(), Some("external resource is up to date"));
        assert!(record.condition(ConditionType::Ready).is_none());
    }

    #[test]
    fn test_error_mirrors_message() {
        let mut record = record();
        record.set_condition(available());
        report(
            &mut record,
            &Err(ReconcilerError::Observe(ProviderError::Transport(
                "connection reset".to_string(),
            ))),
        );

        let synced = record.condition(ConditionType::Synced).unwrap();
        assert!(!synced.is_true());
        assert_eq!(synced.reason.as_deref(), Some("ReconcileError"));
        assert_eq!(
            record.message(),
            Some("observe: cannot observe external resource: cannot reach provider: connection reset")
        );
        // Ready is left as the pass set it
        assert!(record.condition(ConditionType::Ready).unwrap().is_true());
    }

    #[test]
    fn test_repeated_reports_keep_one_condition_per_type() {
        let mut record = record();
        report(&mut record, &Ok(PassOutcome::Created));
        report(&mut record, &Ok(PassOutcome::UpToDate));
        record.set_condition(creating());
        record.set_condition(available());

        let conditions = &record.status.as_ref().unwrap().resource.conditions;
        assert_eq!(conditions.len(), 2);
    }
}

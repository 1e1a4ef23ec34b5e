//! # Common Resource Types
//!
//! Fields shared by every managed resource: provider config reference,
//! deletion policy, connection secret reference and status conditions.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// API group of every custom resource served by this controller
pub const API_GROUP: &str = "alibaba.crossplane.io";

/// API version of every custom resource served by this controller
pub const API_VERSION: &str = "v1alpha1";

/// Whether deleting the record also deletes the external resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
pub enum DeletionPolicy {
    /// Destroy the external resource when the record is deleted
    #[default]
    Delete,
    /// Leave the external resource intact and only stop managing it
    Orphan,
}

/// Reference to a cluster-scoped `ProviderConfig` by name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigReference {
    pub name: String,
}

/// Reference to a namespaced Kubernetes secret
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SecretReference {
    pub name: String,
    pub namespace: String,
}

/// Spec fields common to all managed resources
///
/// Flattened into each resource's spec so the YAML reads
/// `spec.providerConfigRef`, `spec.deletionPolicy` and so on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSpec {
    /// ProviderConfig holding the region and the credentials secret
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_ref: Option<ProviderConfigReference>,
    /// What happens to the external resource when this record is deleted
    #[serde(default)]
    pub deletion_policy: DeletionPolicy,
    /// Secret that receives connection details (endpoints) of the external resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<SecretReference>,
}

/// Condition types written by the reconciler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionType {
    /// The external resource exists and is usable
    Ready,
    /// The last reconciliation pass completed without error
    Synced,
}

impl ConditionType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionType::Ready => "Ready",
            ConditionType::Synced => "Synced",
        }
    }
}

/// Condition represents a status condition for the resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition (Ready, Synced)
    pub r#type: String,
    /// Status of condition (True, False)
    pub status: String,
    /// Last time the status flipped
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Machine-readable reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    /// Whether the condition status is `True`
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.status == "True"
    }
}

/// Status fields common to all managed resources
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResourceStatus {
    #[serde(default)]
    pub conditions: Vec<Condition>,
}

impl ResourceStatus {
    /// Look up a condition by type
    #[must_use]
    pub fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.conditions
            .iter()
            .find(|c| c.r#type == condition_type.as_str())
    }

    /// Replace the condition of the same type, keeping its transition time
    /// when the status did not change.
    pub fn set_condition(&mut self, mut condition: Condition) {
        match self
            .conditions
            .iter_mut()
            .find(|c| c.r#type == condition.r#type)
        {
            Some(existing) => {
                if existing.status == condition.status {
                    condition
                        .last_transition_time
                        .clone_from(&existing.last_transition_time);
                }
                *existing = condition;
            }
            None => self.conditions.push(condition),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn condition(status: &str, time: &str, message: &str) -> Condition {
        Condition {
            r#type: "Synced".to_string(),
            status: status.to_string(),
            last_transition_time: Some(time.to_string()),
            reason: None,
            message: Some(message.to_string()),
        }
    }

    #[test]
    fn test_set_condition_appends_new_type() {
        let mut status = ResourceStatus::default();
        status.set_condition(condition("True", "t1", "ok"));
        assert_eq!(status.conditions.len(), 1);
        assert!(status.condition(ConditionType::Synced).unwrap().is_true());
    }

    #[test]
    fn test_set_condition_keeps_transition_time_when_status_unchanged() {
        let mut status = ResourceStatus::default();
        status.set_condition(condition("True", "t1", "first"));
        status.set_condition(condition("True", "t2", "second"));

        let synced = status.condition(ConditionType::Synced).unwrap();
        assert_eq!(status.conditions.len(), 1);
        assert_eq!(synced.last_transition_time.as_deref(), Some("t1"));
        assert_eq!(synced.message.as_deref(), Some("second"));
    }

    #[test]
    fn test_set_condition_updates_transition_time_on_flip() {
        let mut status = ResourceStatus::default();
        status.set_condition(condition("True", "t1", "ok"));
        status.set_condition(condition("False", "t2", "broken"));

        let synced = status.condition(ConditionType::Synced).unwrap();
        assert_eq!(synced.last_transition_time.as_deref(), Some("t2"));
        assert!(!synced.is_true());
    }

    #[test]
    fn test_deletion_policy_defaults_to_delete() {
        let spec: ResourceSpec = serde_json::from_str("{}").unwrap();
        assert_eq!(spec.deletion_policy, DeletionPolicy::Delete);
        assert!(spec.provider_config_ref.is_none());
    }
}

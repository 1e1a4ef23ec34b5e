//! # OSS
//!
//! Managed resource for an Alibaba Cloud Object Storage Service bucket.

use super::common::{ResourceSpec, ResourceStatus};
use super::managed::{field_drifted, managed_resource, Managed};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// OSS Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: alibaba.crossplane.io/v1alpha1
/// kind: OSS
/// metadata:
///   name: logs-bucket
/// spec:
///   providerConfigRef:
///     name: default
///   forProvider:
///     bucket:
///       name: my-logs-bucket
///       acl: private
///       storageClass: Standard
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "OSS",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    plural = "osses",
    status = "OssStatus",
    category = "crossplane",
    category = "managed",
    category = "alibaba",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type=='Ready')].status"}, {"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type=='Synced')].status"}, {"name":"WARNING", "type":"string", "jsonPath":".status.atProvider.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct OssSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: OssParameters,
}

/// Desired state of the bucket
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OssParameters {
    pub bucket: Bucket,
}

/// The isolated place to store objects
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    /// Globally unique bucket name
    pub name: String,
    /// private, public-read or public-read-write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    /// Standard, IA, Archive or ColdArchive
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    /// LRS or ZRS
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_redundancy_type: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OssStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,
    #[serde(default)]
    pub at_provider: OssObservation,
}

/// Observed state of the bucket
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct OssObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redundancy_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extranet_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intranet_endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

managed_resource!(OSS, OssObservation);

impl Managed for OSS {
    fn external_name(&self) -> String {
        self.spec.for_provider.bucket.name.clone()
    }

    fn drift(&self, observed: &OssObservation) -> Vec<&'static str> {
        let bucket = &self.spec.for_provider.bucket;
        let mut drifted = Vec::new();
        if field_drifted(bucket.acl.as_deref(), observed.acl.as_deref()) {
            drifted.push("acl");
        }
        if field_drifted(
            bucket.storage_class.as_deref(),
            observed.storage_class.as_deref(),
        ) {
            drifted.push("storageClass");
        }
        if field_drifted(
            bucket.data_redundancy_type.as_deref(),
            observed.redundancy_type.as_deref(),
        ) {
            drifted.push("dataRedundancyType");
        }
        drifted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{AtProvider, ManagedParts};

    fn bucket(acl: Option<&str>, storage_class: Option<&str>) -> OSS {
        OSS::new(
            "b1",
            OssSpec {
                resource: ResourceSpec::default(),
                for_provider: OssParameters {
                    bucket: Bucket {
                        name: "b1".to_string(),
                        acl: acl.map(str::to_string),
                        storage_class: storage_class.map(str::to_string),
                        data_redundancy_type: None,
                    },
                },
            },
        )
    }

    fn observed(acl: &str, storage_class: &str) -> OssObservation {
        OssObservation {
            bucket_name: Some("b1".to_string()),
            acl: Some(acl.to_string()),
            storage_class: Some(storage_class.to_string()),
            redundancy_type: Some("LRS".to_string()),
            ..OssObservation::default()
        }
    }

    #[test]
    fn test_matching_bucket_has_no_drift() {
        let record = bucket(Some("private"), Some("Standard"));
        assert!(record.drift(&observed("private", "Standard")).is_empty());
    }

    #[test]
    fn test_provider_defaulted_redundancy_is_not_drift() {
        // dataRedundancyType is unset in the spec; the provider reports LRS
        let record = bucket(Some("private"), None);
        assert!(record.drift(&observed("private", "IA")).is_empty());
    }

    #[test]
    fn test_acl_drift_is_reported_by_field() {
        let record = bucket(Some("public-read"), Some("Standard"));
        assert_eq!(record.drift(&observed("private", "Standard")), vec!["acl"]);
    }

    #[test]
    fn test_set_at_provider_keeps_message() {
        let mut record = bucket(None, None);
        record.set_message(Some("previous error".to_string()));
        record.set_at_provider(observed("private", "Standard"));

        assert_eq!(record.message(), Some("previous error"));
        assert_eq!(
            record.at_provider().unwrap().acl.as_deref(),
            Some("private")
        );
    }

    #[test]
    fn test_spec_flattens_common_fields() {
        let spec: OssSpec = serde_json::from_value(serde_json::json!({
            "providerConfigRef": { "name": "default" },
            "deletionPolicy": "Orphan",
            "forProvider": { "bucket": { "name": "b1", "acl": "private" } }
        }))
        .unwrap();

        assert_eq!(spec.resource.provider_config_ref.unwrap().name, "default");
        assert_eq!(
            spec.resource.deletion_policy,
            crate::crd::DeletionPolicy::Orphan
        );
        assert_eq!(spec.for_provider.bucket.acl.as_deref(), Some("private"));
    }
}

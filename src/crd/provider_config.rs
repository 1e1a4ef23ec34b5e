//! # ProviderConfig
//!
//! Named, cluster-scoped configuration shared by managed resources: the
//! region to talk to and where the access key pair lives.

use super::common::{ProviderConfigReference, SecretReference};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The only credentials source the controller can resolve
pub const CREDENTIALS_SOURCE_SECRET: &str = "Secret";

/// Label carrying the provider config name on usage records
pub const PROVIDER_CONFIG_LABEL: &str = "alibaba.crossplane.io/provider-config";

/// ProviderConfig Custom Resource Definition
///
/// # Example
///
/// ```yaml
/// apiVersion: alibaba.crossplane.io/v1alpha1
/// kind: ProviderConfig
/// metadata:
///   name: default
/// spec:
///   region: cn-hangzhou
///   credentials:
///     source: Secret
///     secretRef:
///       namespace: crossplane-system
///       name: alibaba-account-creds
/// ```
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfig",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    category = "crossplane",
    category = "provider",
    category = "alibaba",
    printcolumn = r#"{"name":"Region", "type":"string", "jsonPath":".spec.region"}, {"name":"Source", "type":"string", "jsonPath":".spec.credentials.source"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigSpec {
    /// Where the access key pair comes from
    pub credentials: ProviderCredentials,
    /// Region of the Alibaba Cloud services, e.g. "cn-hangzhou"
    pub region: String,
}

/// Credentials source of a ProviderConfig
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderCredentials {
    /// Credentials source. Only "Secret" is supported.
    pub source: String,
    /// Secret with `accessKeyId` and `accessKeySecret` keys
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_ref: Option<SecretReference>,
}

/// Bookkeeping record that a managed resource uses a ProviderConfig
///
/// Named after the UID of the managed resource so repeated tracking of the
/// same resource is an idempotent apply.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "ProviderConfigUsage",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    category = "crossplane",
    category = "provider",
    category = "alibaba",
    printcolumn = r#"{"name":"Config-Name", "type":"string", "jsonPath":".spec.providerConfigRef.name"}, {"name":"Resource-Kind", "type":"string", "jsonPath":".spec.resourceRef.kind"}, {"name":"Resource-Name", "type":"string", "jsonPath":".spec.resourceRef.name"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfigUsageSpec {
    pub provider_config_ref: ProviderConfigReference,
    pub resource_ref: TypedReference,
}

/// Reference to a managed resource of any kind
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct TypedReference {
    pub api_version: String,
    pub kind: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_config_deserializes_unsupported_source() {
        let spec: ProviderConfigSpec = serde_json::from_value(serde_json::json!({
            "region": "cn-beijing",
            "credentials": { "source": "OIDC" }
        }))
        .unwrap();

        assert_eq!(spec.credentials.source, "OIDC");
        assert!(spec.credentials.secret_ref.is_none());
    }

    #[test]
    fn test_provider_config_secret_ref_is_camel_case() {
        let spec: ProviderConfigSpec = serde_json::from_value(serde_json::json!({
            "region": "cn-hangzhou",
            "credentials": {
                "source": "Secret",
                "secretRef": { "namespace": "crossplane-system", "name": "creds" }
            }
        }))
        .unwrap();

        let secret_ref = spec.credentials.secret_ref.unwrap();
        assert_eq!(secret_ref.namespace, "crossplane-system");
        assert_eq!(secret_ref.name, "creds");
    }
}

//! # Stores
//!
//! Lookups the reconciler needs from the cluster, behind traits so the core
//! can run against in-memory stores in tests:
//!
//! - [`ProviderConfigStore`] - named `ProviderConfig` objects
//! - [`SecretStore`] - credentials secrets
//! - [`UsageTracker`] - `ProviderConfigUsage` bookkeeping
//! - [`ConnectionSecretWriter`] - connection details of external resources
//!
//! [`KubeStores`] implements all four against the Kubernetes API.

use crate::constants::FIELD_MANAGER;
use crate::crd::{ProviderConfig, ProviderConfigUsage, SecretReference, PROVIDER_CONFIG_LABEL};
use crate::provider::ConnectionDetails;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use k8s_openapi::ByteString;
use kube::api::{DeleteParams, ListParams, ObjectMeta, Patch, PatchParams};
use kube::{Api, Client, ResourceExt};
use std::collections::BTreeMap;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{kind} {name} not found")]
    NotFound { kind: &'static str, name: String },

    #[error("Kubernetes API error: {0}")]
    Api(String),
}

impl StoreError {
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }

    fn from_kube(error: kube::Error, kind: &'static str, name: &str) -> Self {
        match error {
            kube::Error::Api(response) if response.code == 404 => StoreError::NotFound {
                kind,
                name: name.to_string(),
            },
            other => StoreError::Api(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ProviderConfigStore: Send + Sync {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError>;
}

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Decoded string values of a secret, keyed by data key
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError>;
}

#[async_trait]
pub trait UsageTracker: Send + Sync {
    /// Record that a managed resource uses a provider config. Idempotent.
    async fn track(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError>;

    /// Drop the usage record named `usage_name`. Missing records are fine.
    async fn release(&self, usage_name: &str) -> Result<(), StoreError>;

    /// Names of the usage records that still reference `provider_config`
    async fn users(&self, provider_config: &str) -> Result<Vec<String>, StoreError>;
}

#[async_trait]
pub trait ConnectionSecretWriter: Send + Sync {
    /// Write connection details into the referenced secret, owned by `owner`
    async fn publish(
        &self,
        secret_ref: &SecretReference,
        owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), StoreError>;
}

/// All stores backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeStores {
    client: Client,
}

impl std::fmt::Debug for KubeStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeStores").finish_non_exhaustive()
    }
}

impl KubeStores {
    #[must_use]
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderConfigStore for KubeStores {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        let api: Api<ProviderConfig> = Api::all(self.client.clone());
        api.get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfig", name))
    }
}

#[async_trait]
impl SecretStore for KubeStores {
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api
            .get(name)
            .await
            .map_err(|e| StoreError::from_kube(e, "Secret", &format!("{namespace}/{name}")))?;

        // stringData is write-only; the API server folds it into data
        Ok(secret
            .data
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| String::from_utf8(value.0).ok().map(|v| (key, v)))
            .collect())
    }
}

#[async_trait]
impl UsageTracker for KubeStores {
    async fn track(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.clone().unwrap_or_default();
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        api.patch(
            &name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(usage),
        )
        .await
        .map(|_| ())
        .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", &name))
    }

    async fn release(&self, usage_name: &str) -> Result<(), StoreError> {
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        match api.delete(usage_name, &DeleteParams::default()).await {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(response)) if response.code == 404 => Ok(()),
            Err(e) => Err(StoreError::from_kube(e, "ProviderConfigUsage", usage_name)),
        }
    }

    async fn users(&self, provider_config: &str) -> Result<Vec<String>, StoreError> {
        let api: Api<ProviderConfigUsage> = Api::all(self.client.clone());
        let selector = format!("{PROVIDER_CONFIG_LABEL}={provider_config}");
        let usages = api
            .list(&ListParams::default().labels(&selector))
            .await
            .map_err(|e| StoreError::from_kube(e, "ProviderConfigUsage", provider_config))?;
        Ok(usages.items.iter().map(ResourceExt::name_any).collect())
    }
}

#[async_trait]
impl ConnectionSecretWriter for KubeStores {
    async fn publish(
        &self,
        secret_ref: &SecretReference,
        owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), StoreError> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), &secret_ref.namespace);
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(secret_ref.name.clone()),
                namespace: Some(secret_ref.namespace.clone()),
                owner_references: owner.map(|o| vec![o]),
                ..ObjectMeta::default()
            },
            type_: Some("connection.crossplane.io/v1alpha1".to_string()),
            data: Some(
                details
                    .iter()
                    .map(|(k, v)| (k.clone(), ByteString(v.as_bytes().to_vec())))
                    .collect(),
            ),
            ..Secret::default()
        };
        api.patch(
            &secret_ref.name,
            &PatchParams::apply(FIELD_MANAGER).force(),
            &Patch::Apply(&secret),
        )
        .await
        .map(|_| ())
        .map_err(|e| {
            StoreError::from_kube(
                e,
                "Secret",
                &format!("{}/{}", secret_ref.namespace, secret_ref.name),
            )
        })
    }
}

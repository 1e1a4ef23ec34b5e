//! # Credential Resolver
//!
//! Turns a managed record into [`Credentials`] by following its
//! `providerConfigRef` to a `ProviderConfig` and from there to the secret
//! holding the access key pair. Checks run in a fixed order so the first
//! missing piece is the one reported:
//!
//! 1. provider config reference present
//! 2. usage tracked
//! 3. provider config fetched
//! 4. credentials source is `Secret`
//! 5. secret reference present
//! 6. endpoint built for the kind and region
//! 7. secret fetched
//! 8. both keys present

use super::endpoint::{EndpointError, EndpointRegistry};
use super::store::{ProviderConfigStore, SecretStore, StoreError, UsageTracker};
use crate::constants::{ACCESS_KEY_ID_KEY, ACCESS_KEY_SECRET_KEY};
use crate::crd::{
    Managed, ProviderConfigUsage, ProviderConfigUsageSpec, TypedReference,
    CREDENTIALS_SOURCE_SECRET, HasProviderConfigReference, PROVIDER_CONFIG_LABEL,
};
use crate::provider::{ClientFactory, Credentials, ExternalClient, ProviderError};
use kube::api::ObjectMeta;
use kube::{Resource, ResourceExt};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("no provider config or provider specified")]
    NoProviderConfig,

    #[error("cannot track provider config usage: {0}")]
    TrackUsage(#[source] StoreError),

    #[error("cannot get provider config: {0}")]
    GetProviderConfig(#[source] StoreError),

    #[error("credentials source {0:?} is not currently supported")]
    UnsupportedCredentialsSource(String),

    #[error("no connection secret specified")]
    NoConnectionSecret,

    #[error("cannot get connection secret: {0}")]
    GetConnectionSecret(#[source] StoreError),

    #[error("connection secret {secret} has no {key} key")]
    MissingCredentialKey { secret: String, key: &'static str },

    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("cannot authenticate: {0}")]
    Authentication(#[source] ProviderError),
}

/// Resolves credentials and connects the kind's [`ClientFactory`]
pub struct Connector<R: Managed> {
    provider_configs: Arc<dyn ProviderConfigStore>,
    secrets: Arc<dyn SecretStore>,
    usage: Arc<dyn UsageTracker>,
    endpoints: Arc<EndpointRegistry>,
    factory: Arc<dyn ClientFactory<R>>,
}

impl<R: Managed> std::fmt::Debug for Connector<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connector")
            .field("kind", &R::kind(&()))
            .field("endpoints", &self.endpoints)
            .finish_non_exhaustive()
    }
}

impl<R: Managed> Connector<R> {
    #[must_use]
    pub fn new(
        provider_configs: Arc<dyn ProviderConfigStore>,
        secrets: Arc<dyn SecretStore>,
        usage: Arc<dyn UsageTracker>,
        endpoints: Arc<EndpointRegistry>,
        factory: Arc<dyn ClientFactory<R>>,
    ) -> Self {
        Self {
            provider_configs,
            secrets,
            usage,
            endpoints,
            factory,
        }
    }

    /// Resolve the credentials of `record`
    ///
    /// Reads the provider config and the secret fresh on every call. The
    /// only side effect is the usage record.
    pub async fn resolve(&self, record: &R) -> Result<Credentials, ConnectError> {
        let config_ref = record
            .provider_config_reference()
            .ok_or(ConnectError::NoProviderConfig)?;

        self.usage
            .track(&usage_for(record, &config_ref.name))
            .await
            .map_err(ConnectError::TrackUsage)?;

        let config = self
            .provider_configs
            .get_provider_config(&config_ref.name)
            .await
            .map_err(ConnectError::GetProviderConfig)?;

        let credentials = &config.spec.credentials;
        if credentials.source != CREDENTIALS_SOURCE_SECRET {
            return Err(ConnectError::UnsupportedCredentialsSource(
                credentials.source.clone(),
            ));
        }
        let secret_ref = credentials
            .secret_ref
            .as_ref()
            .ok_or(ConnectError::NoConnectionSecret)?;

        let endpoint = self
            .endpoints
            .build_endpoint(&R::kind(&()), &config.spec.region)?;

        let data = self
            .secrets
            .get_secret_data(&secret_ref.namespace, &secret_ref.name)
            .await
            .map_err(ConnectError::GetConnectionSecret)?;

        let secret = format!("{}/{}", secret_ref.namespace, secret_ref.name);
        let key = |key: &'static str| {
            data.get(key)
                .cloned()
                .ok_or_else(|| ConnectError::MissingCredentialKey {
                    secret: secret.clone(),
                    key,
                })
        };

        Ok(Credentials {
            endpoint,
            region: config.spec.region.trim().to_string(),
            access_key_id: key(ACCESS_KEY_ID_KEY)?,
            access_key_secret: key(ACCESS_KEY_SECRET_KEY)?,
        })
    }

    /// Resolve credentials and build an external client for `record`
    pub async fn connect(&self, record: &R) -> Result<Box<dyn ExternalClient<R>>, ConnectError> {
        let credentials = self.resolve(record).await?;
        self.factory
            .connect(&credentials)
            .await
            .map_err(ConnectError::Authentication)
    }

    /// Drop the usage record of `record`
    pub async fn release(&self, record: &R) -> Result<(), StoreError> {
        self.usage.release(&usage_name(record)).await
    }
}

/// Usage records are named after the record's UID, or its name before the
/// API server assigned one.
pub(crate) fn usage_name<R: Managed>(record: &R) -> String {
    record.uid().unwrap_or_else(|| record.name_any())
}

fn usage_for<R: Managed>(record: &R, config_name: &str) -> ProviderConfigUsage {
    let mut usage = ProviderConfigUsage::new(
        &usage_name(record),
        ProviderConfigUsageSpec {
            provider_config_ref: crate::crd::ProviderConfigReference {
                name: config_name.to_string(),
            },
            resource_ref: TypedReference {
                api_version: R::api_version(&()).to_string(),
                kind: R::kind(&()).to_string(),
                name: record.name_any(),
            },
        },
    );
    usage.metadata = ObjectMeta {
        name: usage.metadata.name.take(),
        labels: Some(BTreeMap::from([(
            PROVIDER_CONFIG_LABEL.to_string(),
            config_name.to_string(),
        )])),
        owner_references: record.controller_owner_ref(&()).map(|o| vec![o]),
        ..ObjectMeta::default()
    };
    usage
}

//! In-memory stores and a fake OSS cloud for driving the reconciler
//! without a cluster or network.

#![allow(dead_code, reason = "each test binary uses a subset of the helpers")]

use alibaba_provider_controller::controller::reconciler::{
    ConnectionSecretWriter, Connector, EndpointRegistry, ManagedReconciler, ProviderConfigStore,
    SecretStore, StoreError, UsageTracker,
};
use alibaba_provider_controller::prelude::*;
use async_trait::async_trait;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const CONFIG_NAME: &str = "default";
pub const SECRET_NAMESPACE: &str = "crossplane-system";
pub const SECRET_NAME: &str = "alibaba-creds";

#[derive(Default)]
pub struct MemoryStores {
    pub configs: Mutex<BTreeMap<String, ProviderConfig>>,
    pub secrets: Mutex<BTreeMap<(String, String), BTreeMap<String, String>>>,
    /// Usage record name to the provider config it references
    pub usages: Mutex<BTreeMap<String, String>>,
    pub published: Mutex<Vec<(SecretReference, ConnectionDetails)>>,
}

impl MemoryStores {
    /// Stores holding a working `default` provider config and its secret
    pub fn with_credentials(source: &str) -> Arc<Self> {
        let stores = Self::default();
        stores.configs.lock().unwrap().insert(
            CONFIG_NAME.to_string(),
            ProviderConfig::new(
                CONFIG_NAME,
                ProviderConfigSpec {
                    region: "cn-hangzhou".to_string(),
                    credentials: ProviderCredentials {
                        source: source.to_string(),
                        secret_ref: Some(SecretReference {
                            namespace: SECRET_NAMESPACE.to_string(),
                            name: SECRET_NAME.to_string(),
                        }),
                    },
                },
            ),
        );
        stores.secrets.lock().unwrap().insert(
            (SECRET_NAMESPACE.to_string(), SECRET_NAME.to_string()),
            BTreeMap::from([
                ("accessKeyId".to_string(), "LTAI5tExample".to_string()),
                ("accessKeySecret".to_string(), "example-secret".to_string()),
            ]),
        );
        Arc::new(stores)
    }
}

#[async_trait]
impl ProviderConfigStore for MemoryStores {
    async fn get_provider_config(&self, name: &str) -> Result<ProviderConfig, StoreError> {
        self.configs
            .lock()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "ProviderConfig",
                name: name.to_string(),
            })
    }
}

#[async_trait]
impl SecretStore for MemoryStores {
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>, StoreError> {
        self.secrets
            .lock()
            .unwrap()
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                kind: "Secret",
                name: format!("{namespace}/{name}"),
            })
    }
}

#[async_trait]
impl UsageTracker for MemoryStores {
    async fn track(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
        let name = usage.metadata.name.clone().unwrap_or_default();
        self.usages
            .lock()
            .unwrap()
            .insert(name, usage.spec.provider_config_ref.name.clone());
        Ok(())
    }

    async fn release(&self, usage_name: &str) -> Result<(), StoreError> {
        self.usages.lock().unwrap().remove(usage_name);
        Ok(())
    }

    async fn users(&self, provider_config: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .usages
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, config)| *config == provider_config)
            .map(|(usage, _)| usage.clone())
            .collect())
    }
}

#[async_trait]
impl ConnectionSecretWriter for MemoryStores {
    async fn publish(
        &self,
        secret_ref: &SecretReference,
        _owner: Option<OwnerReference>,
        details: &ConnectionDetails,
    ) -> Result<(), StoreError> {
        self.published
            .lock()
            .unwrap()
            .push((secret_ref.clone(), details.clone()));
        Ok(())
    }
}

/// Provider-side state of the fake OSS service
#[derive(Debug, Default)]
pub struct FakeCloud {
    pub buckets: BTreeMap<String, OssObservation>,
    /// Every adapter call, in order: `connect`, `observe`, `create`, ...
    pub calls: Vec<&'static str>,
    /// Make observe never return
    pub hang_observe: bool,
}

impl FakeCloud {
    pub fn shared() -> Arc<Mutex<Self>> {
        Arc::new(Mutex::new(Self::default()))
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls.iter().filter(|c| **c == call).count()
    }

    pub fn mutating_calls(&self) -> usize {
        self.count("create") + self.count("update") + self.count("delete")
    }
}

/// Bucket as the fake provider reports it, with provider defaults filled in
pub fn observed_bucket(name: &str, acl: &str, storage_class: &str) -> OssObservation {
    OssObservation {
        bucket_name: Some(name.to_string()),
        acl: Some(acl.to_string()),
        storage_class: Some(storage_class.to_string()),
        redundancy_type: Some("LRS".to_string()),
        extranet_endpoint: Some("oss-cn-hangzhou.aliyuncs.com".to_string()),
        intranet_endpoint: Some("oss-cn-hangzhou-internal.aliyuncs.com".to_string()),
        message: None,
    }
}

pub struct FakeOss {
    cloud: Arc<Mutex<FakeCloud>>,
}

#[async_trait]
impl ExternalClient<OSS> for FakeOss {
    async fn observe(&self, record: &OSS) -> Result<ExternalState<OssObservation>, ProviderError> {
        let hang = {
            let mut cloud = self.cloud.lock().unwrap();
            cloud.calls.push("observe");
            cloud.hang_observe
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let cloud = self.cloud.lock().unwrap();
        Ok(match cloud.buckets.get(&record.external_name()) {
            None => ExternalState::Absent,
            Some(observation) => ExternalState::Present {
                observation: observation.clone(),
                connection_details: ConnectionDetails::from([(
                    "extranetEndpoint".to_string(),
                    observation.extranet_endpoint.clone().unwrap_or_default(),
                )]),
            },
        })
    }

    async fn create(&self, record: &OSS) -> Result<(), ProviderError> {
        let bucket = &record.spec.for_provider.bucket;
        let mut cloud = self.cloud.lock().unwrap();
        cloud.calls.push("create");
        if cloud.buckets.contains_key(&bucket.name) {
            return Err(ProviderError::Rejected {
                status: 409,
                code: "BucketAlreadyExists".to_string(),
                message: "The requested bucket name is not available.".to_string(),
            });
        }
        cloud.buckets.insert(
            bucket.name.clone(),
            observed_bucket(
                &bucket.name,
                bucket.acl.as_deref().unwrap_or("private"),
                bucket.storage_class.as_deref().unwrap_or("Standard"),
            ),
        );
        Ok(())
    }

    async fn update(&self, record: &OSS, observed: &OssObservation) -> Result<(), ProviderError> {
        let mut cloud = self.cloud.lock().unwrap();
        cloud.calls.push("update");
        let drifted = record.drift(observed);
        if drifted.contains(&"storageClass") {
            return Err(ProviderError::Immutable {
                field: "storageClass",
            });
        }
        if let Some(bucket) = cloud.buckets.get_mut(&record.external_name()) {
            bucket.acl.clone_from(&record.spec.for_provider.bucket.acl);
        }
        Ok(())
    }

    async fn delete(&self, record: &OSS) -> Result<(), ProviderError> {
        let mut cloud = self.cloud.lock().unwrap();
        cloud.calls.push("delete");
        cloud.buckets.remove(&record.external_name());
        Ok(())
    }
}

pub struct FakeOssFactory {
    pub cloud: Arc<Mutex<FakeCloud>>,
}

#[async_trait]
impl ClientFactory<OSS> for FakeOssFactory {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExternalClient<OSS>>, ProviderError> {
        self.cloud.lock().unwrap().calls.push("connect");
        assert_eq!(credentials.endpoint, "http://oss-cn-hangzhou.aliyuncs.com");
        Ok(Box::new(FakeOss {
            cloud: self.cloud.clone(),
        }))
    }
}

pub fn reconciler(
    stores: &Arc<MemoryStores>,
    cloud: &Arc<Mutex<FakeCloud>>,
    cancel: CancellationToken,
) -> ManagedReconciler<OSS> {
    let connector = Connector::new(
        stores.clone(),
        stores.clone(),
        stores.clone(),
        Arc::new(EndpointRegistry::with_builtin_kinds()),
        Arc::new(FakeOssFactory {
            cloud: cloud.clone(),
        }),
    );
    ManagedReconciler::new(
        connector,
        stores.clone(),
        cancel,
        Duration::from_secs(30),
    )
}

pub fn bucket_record(name: &str, acl: Option<&str>, storage_class: Option<&str>) -> OSS {
    OSS::new(
        name,
        OssSpec {
            resource: ResourceSpec {
                provider_config_ref: Some(ProviderConfigReference {
                    name: CONFIG_NAME.to_string(),
                }),
                ..ResourceSpec::default()
            },
            for_provider: OssParameters {
                bucket: Bucket {
                    name: name.to_string(),
                    acl: acl.map(str::to_string),
                    storage_class: storage_class.map(str::to_string),
                    data_redundancy_type: None,
                },
            },
        },
    )
}

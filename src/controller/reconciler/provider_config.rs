//! # ProviderConfig Guard
//!
//! Keeps a `ProviderConfig` alive while managed records still use it. Every
//! config carries the in-use finalizer; deleting one only completes once no
//! `ProviderConfigUsage` labelled with its name is left, so records that
//! reference it can still resolve credentials while they delete their
//! external resources.

use super::store::{StoreError, UsageTracker};
use crate::config::SharedControllerConfig;
use crate::constants::IN_USE_FINALIZER;
use crate::crd::ProviderConfig;
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::controller::Action;
use kube_runtime::finalizer::{finalizer, Error as FinalizerError, Event};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, Instrument};

#[derive(Debug, Error)]
pub enum ProviderConfigError {
    #[error("cannot list provider config usages: {0}")]
    ListUsages(#[source] StoreError),

    #[error("provider config {name} is still used by {users} resource(s)")]
    InUse { name: String, users: usize },

    #[error("finalizer: {0}")]
    Finalizer(String),
}

/// Shared state of the `ProviderConfig` controller
pub struct ProviderConfigContext {
    pub client: Client,
    pub usages: Arc<dyn UsageTracker>,
    pub config: SharedControllerConfig,
}

impl std::fmt::Debug for ProviderConfigContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfigContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Fail with [`ProviderConfigError::InUse`] while any usage record references `name`
pub async fn ensure_unused(
    usages: &dyn UsageTracker,
    name: &str,
) -> Result<(), ProviderConfigError> {
    let users = usages
        .users(name)
        .await
        .map_err(ProviderConfigError::ListUsages)?;
    if users.is_empty() {
        return Ok(());
    }
    debug!(users = ?users, "Provider config still in use");
    Err(ProviderConfigError::InUse {
        name: name.to_string(),
        users: users.len(),
    })
}

/// Reconcile one `ProviderConfig`: hold the in-use finalizer until it is unused
pub async fn reconcile_provider_config(
    provider_config: Arc<ProviderConfig>,
    ctx: Arc<ProviderConfigContext>,
) -> Result<Action, ProviderConfigError> {
    let name = provider_config.name_any();
    let span = tracing::info_span!(
        "reconcile",
        resource.kind = "ProviderConfig",
        resource.name = name.as_str()
    );

    async move {
        let api: Api<ProviderConfig> = Api::all(ctx.client.clone());
        let usages = ctx.usages.as_ref();
        finalizer(&api, IN_USE_FINALIZER, provider_config, move |event| async move {
            match event {
                Event::Apply(_) => Ok(Action::await_change()),
                Event::Cleanup(provider_config) => release(usages, &provider_config).await,
            }
        })
        .await
        .map_err(|e| match e {
            FinalizerError::ApplyFailed(e) | FinalizerError::CleanupFailed(e) => e,
            other => ProviderConfigError::Finalizer(other.to_string()),
        })
    }
    .instrument(span)
    .await
}

async fn release(
    usages: &dyn UsageTracker,
    provider_config: &ProviderConfig,
) -> Result<Action, ProviderConfigError> {
    let name = provider_config.name_any();
    ensure_unused(usages, &name).await?;
    info!("Provider config {} is unused, releasing it", name);
    Ok(Action::await_change())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ProviderConfigUsage;
    use async_trait::async_trait;
    use std::collections::BTreeMap;
    use std::sync::Mutex;

    /// Usage name to provider config name
    #[derive(Default)]
    struct Usages(Mutex<BTreeMap<String, String>>);

    #[async_trait]
    impl UsageTracker for Usages {
        async fn track(&self, usage: &ProviderConfigUsage) -> Result<(), StoreError> {
            self.0.lock().unwrap().insert(
                usage.name_any(),
                usage.spec.provider_config_ref.name.clone(),
            );
            Ok(())
        }

        async fn release(&self, usage_name: &str) -> Result<(), StoreError> {
            self.0.lock().unwrap().remove(usage_name);
            Ok(())
        }

        async fn users(&self, provider_config: &str) -> Result<Vec<String>, StoreError> {
            Ok(self
                .0
                .lock()
                .unwrap()
                .iter()
                .filter(|(_, config)| *config == provider_config)
                .map(|(usage, _)| usage.clone())
                .collect())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl UsageTracker for Unreachable {
        async fn track(&self, _usage: &ProviderConfigUsage) -> Result<(), StoreError> {
            Ok(())
        }

        async fn release(&self, _usage_name: &str) -> Result<(), StoreError> {
            Ok(())
        }

        async fn users(&self, _provider_config: &str) -> Result<Vec<String>, StoreError> {
            Err(StoreError::Api("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_config_with_users_is_held() {
        let usages = Usages::default();
        usages.0.lock().unwrap().insert("uid-1".to_string(), "default".to_string());
        usages.0.lock().unwrap().insert("uid-2".to_string(), "default".to_string());
        usages.0.lock().unwrap().insert("uid-3".to_string(), "other".to_string());

        let err = ensure_unused(&usages, "default").await.unwrap_err();
        assert!(matches!(err, ProviderConfigError::InUse { users: 2, .. }));
        assert_eq!(
            err.to_string(),
            "provider config default is still used by 2 resource(s)"
        );
    }

    #[tokio::test]
    async fn test_config_is_released_after_last_user() {
        let usages = Usages::default();
        usages.0.lock().unwrap().insert("uid-1".to_string(), "default".to_string());
        assert!(ensure_unused(&usages, "default").await.is_err());

        usages.release("uid-1").await.unwrap();
        assert!(ensure_unused(&usages, "default").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_failure_keeps_config() {
        let err = ensure_unused(&Unreachable, "default").await.unwrap_err();
        assert!(matches!(err, ProviderConfigError::ListUsages(_)));
    }
}

//! # Watch Loop
//!
//! One kube-runtime controller per managed kind. Each controller watches its
//! records and also the `ProviderConfig` objects, so fixing a broken
//! provider config re-triggers the records that use it. A separate
//! controller holds every `ProviderConfig` while usage records reference it.
//!
//! All controllers stop gracefully once the shared cancellation token fires,
//! which [`spawn_shutdown_handler`] does on SIGINT or SIGTERM.

use crate::config::SharedControllerConfig;
use crate::controller::reconciler::{
    reconcile, reconcile_provider_config, ProviderConfigContext, ReconcileContext,
};
use crate::controller::server::ServerState;
use crate::crd::{
    HasProviderConfigReference, Managed, ProviderConfig, ProviderConfigUsage,
    PROVIDER_CONFIG_LABEL,
};
use crate::runtime::error_policy::{
    handle_provider_config_error, handle_reconciliation_error, handle_watch_stream_error,
};
use futures::{Stream, StreamExt};
use kube::api::Api;
use kube::{Client, ResourceExt};
use kube_runtime::reflector::{ObjectRef, Store};
use kube_runtime::{controller, watcher, Controller};
use std::fmt::Debug;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

/// Run the controller of kind `R` until shutdown
///
/// Restarts the watch when its stream ends, unless shutdown was requested.
pub async fn run_watch_loop<R: Managed>(
    client: Client,
    ctx: Arc<ReconcileContext<R>>,
    controller_config: SharedControllerConfig,
    cancel: CancellationToken,
) -> Result<(), anyhow::Error> {
    let kind = R::kind(&()).to_string();
    let backoff_duration_ms = Arc::new(AtomicU64::new(controller_config.watch_backoff_start_ms));

    loop {
        if cancel.is_cancelled() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            resource.kind = kind.as_str()
        );
        info!(parent: &watch_span, "Starting {} controller watch loop...", kind);

        let records: Api<R> = Api::all(client.clone());
        let provider_configs: Api<ProviderConfig> = Api::all(client.clone());
        let controller = Controller::new(records, watcher::Config::default().any_semantic())
            .with_config(
                controller::Config::default()
                    .concurrency(controller_config.max_concurrent_reconciliations),
            );
        let store = controller.store();

        let events = controller
            .watches(provider_configs, watcher::Config::default(), move |provider_config| {
                dependents(&store, &provider_config)
            })
            .graceful_shutdown_on(cancel.clone().cancelled_owned())
            .run(reconcile::<R>, handle_reconciliation_error::<R>, ctx.clone());
        drain_events(events, &backoff_duration_ms, &controller_config)
            .instrument(watch_span)
            .await;

        if cancel.is_cancelled() {
            info!("Shutdown requested, exiting {} watch loop", kind);
            break;
        }

        let delay = controller_config.watch_restart_delay_after_end_duration();
        warn!(
            "{} controller watch stream ended, restarting in {:?}...",
            kind, delay
        );
        tokio::time::sleep(delay).await;
    }

    info!("{} controller stopped gracefully", kind);
    Ok(())
}

/// Run the `ProviderConfig` in-use controller until shutdown
///
/// Usage records re-trigger the config named by their label, so a config
/// waiting for deletion is released as soon as its last user goes away.
pub async fn run_provider_config_loop(
    client: Client,
    ctx: Arc<ProviderConfigContext>,
    controller_config: SharedControllerConfig,
    cancel: CancellationToken,
) -> Result<(), anyhow::Error> {
    let backoff_duration_ms = Arc::new(AtomicU64::new(controller_config.watch_backoff_start_ms));

    loop {
        if cancel.is_cancelled() {
            break;
        }

        let watch_span = tracing::span!(
            tracing::Level::INFO,
            "controller.watch",
            resource.kind = "ProviderConfig"
        );
        info!(parent: &watch_span, "Starting ProviderConfig controller watch loop...");

        let provider_configs: Api<ProviderConfig> = Api::all(client.clone());
        let usages: Api<ProviderConfigUsage> = Api::all(client.clone());
        let events = Controller::new(provider_configs, watcher::Config::default())
            .watches(usages, watcher::Config::default(), |usage| {
                used_provider_config(&usage)
            })
            .graceful_shutdown_on(cancel.clone().cancelled_owned())
            .run(reconcile_provider_config, handle_provider_config_error, ctx.clone());
        drain_events(events, &backoff_duration_ms, &controller_config)
            .instrument(watch_span)
            .await;

        if cancel.is_cancelled() {
            break;
        }

        let delay = controller_config.watch_restart_delay_after_end_duration();
        warn!(
            "ProviderConfig controller watch stream ended, restarting in {:?}...",
            delay
        );
        tokio::time::sleep(delay).await;
    }

    info!("ProviderConfig controller stopped gracefully");
    Ok(())
}

/// Consume controller events, backing off on watch errors
async fn drain_events<S, T, E>(
    events: S,
    backoff: &Arc<AtomicU64>,
    config: &SharedControllerConfig,
) where
    S: Stream<Item = Result<T, E>>,
    E: Debug,
{
    events
        .filter_map(|event| {
            let backoff = backoff.clone();
            let config = config.clone();
            async move {
                match &event {
                    Ok(_) => {
                        backoff.store(config.watch_backoff_start_ms, Ordering::Relaxed);
                        debug!("watch.event.success");
                        Some(event)
                    }
                    Err(e) => handle_watch_stream_error(
                        &format!("{e:?}"),
                        &backoff,
                        config.watch_backoff_max_ms,
                        config.watch_restart_delay_duration(),
                    )
                    .await
                    .map(|()| event),
                }
            }
        })
        .for_each(|_| futures::future::ready(()))
        .await;
}

/// The `ProviderConfig` a usage record points at, from its label
fn used_provider_config(usage: &ProviderConfigUsage) -> Option<ObjectRef<ProviderConfig>> {
    usage
        .labels()
        .get(PROVIDER_CONFIG_LABEL)
        .map(|name| ObjectRef::new(name))
}

/// Records of kind `R` that reference `config`
fn dependents<R: Managed>(store: &Store<R>, config: &ProviderConfig) -> Vec<ObjectRef<R>> {
    let name = config.name_any();
    store
        .state()
        .into_iter()
        .filter(|record| {
            record
                .provider_config_reference()
                .is_some_and(|reference| reference.name == name)
        })
        .map(|record| ObjectRef::from_obj(record.as_ref()))
        .collect()
}

/// Cancel in-flight provider calls and mark the server not ready on SIGINT/SIGTERM
pub fn spawn_shutdown_handler(server_state: Arc<ServerState>, cancel: CancellationToken) {
    tokio::spawn(shut_down_on(shutdown_signal(), server_state, cancel));
}

async fn shut_down_on(
    signal: impl Future<Output = ()>,
    server_state: Arc<ServerState>,
    cancel: CancellationToken,
) {
    signal.await;
    info!("Received shutdown signal, initiating graceful shutdown...");
    server_state.is_ready.store(false, Ordering::Relaxed);
    cancel.cancel();
}

/// Resolves on the first SIGINT or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for SIGINT: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received SIGINT"),
        () = terminate => info!("Received SIGTERM"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{
        Bucket, OssParameters, OssSpec, ProviderConfigReference, ProviderConfigSpec,
        ProviderCredentials, ResourceSpec, OSS,
    };
    use kube_runtime::reflector::store::Writer;
    use std::sync::atomic::AtomicBool;

    fn bucket(name: &str, config: Option<&str>) -> OSS {
        OSS::new(
            name,
            OssSpec {
                resource: ResourceSpec {
                    provider_config_ref: config.map(|name| ProviderConfigReference {
                        name: name.to_string(),
                    }),
                    ..ResourceSpec::default()
                },
                for_provider: OssParameters {
                    bucket: Bucket {
                        name: name.to_string(),
                        ..Bucket::default()
                    },
                },
            },
        )
    }

    #[test]
    fn test_provider_config_change_maps_to_its_dependents() {
        let mut writer: Writer<OSS> = Writer::default();
        for record in [
            bucket("uses-default", Some("default")),
            bucket("uses-other", Some("other")),
            bucket("no-ref", None),
        ] {
            writer.apply_watcher_event(&watcher::Event::Apply(record));
        }
        let store = writer.as_reader();

        let config = ProviderConfig::new(
            "default",
            ProviderConfigSpec {
                region: "cn-hangzhou".to_string(),
                credentials: ProviderCredentials {
                    source: "Secret".to_string(),
                    secret_ref: None,
                },
            },
        );

        let refs = dependents(&store, &config);
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].name, "uses-default");
    }

    #[test]
    fn test_usage_maps_to_its_labelled_provider_config() {
        let mut usage = ProviderConfigUsage::new(
            "uid-1",
            crate::crd::ProviderConfigUsageSpec {
                provider_config_ref: ProviderConfigReference {
                    name: "default".to_string(),
                },
                resource_ref: crate::crd::TypedReference {
                    api_version: "alibaba.crossplane.io/v1alpha1".to_string(),
                    kind: "OSS".to_string(),
                    name: "b1".to_string(),
                },
            },
        );
        assert!(used_provider_config(&usage).is_none());

        usage
            .labels_mut()
            .insert(PROVIDER_CONFIG_LABEL.to_string(), "default".to_string());
        let config = used_provider_config(&usage).unwrap();
        assert_eq!(config.name, "default");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_calls_and_marks_not_ready() {
        let server_state = Arc::new(ServerState {
            is_ready: Arc::new(AtomicBool::new(true)),
        });
        let cancel = CancellationToken::new();

        shut_down_on(std::future::ready(()), server_state.clone(), cancel.clone()).await;

        assert!(cancel.is_cancelled());
        assert!(!server_state.is_ready.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn test_shutdown_waits_for_signal() {
        let server_state = Arc::new(ServerState {
            is_ready: Arc::new(AtomicBool::new(true)),
        });
        let cancel = CancellationToken::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(shut_down_on(
            async move {
                let _ = rx.await;
            },
            server_state.clone(),
            cancel.clone(),
        ));

        tokio::task::yield_now().await;
        assert!(!cancel.is_cancelled());
        assert!(server_state.is_ready.load(Ordering::Relaxed));

        tx.send(()).unwrap();
        handle.await.unwrap();
        assert!(cancel.is_cancelled());
    }
}

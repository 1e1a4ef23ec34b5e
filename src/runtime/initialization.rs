//! # Initialization
//!
//! Controller initialization logic: rustls setup, tracing, metrics, server
//! startup, Kubernetes client and the per-kind reconcile contexts.

use crate::config::{create_shared_config, SharedControllerConfig};
use crate::controller::reconciler::{
    Connector, EndpointRegistry, KubeStores, ManagedReconciler, ProviderConfigContext,
    ReconcileContext, RequeuePolicy,
};
use crate::controller::server::{start_server, ServerState};
use crate::crd::Managed;
use crate::observability;
use crate::provider::ClientFactory;
use anyhow::{Context, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Everything the watch loops need, created once at startup
pub struct InitializationResult {
    /// Kubernetes client
    pub client: Client,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
    /// Controller configuration
    pub controller_config: SharedControllerConfig,
    /// Cancelled on shutdown; aborts in-flight provider calls
    pub cancel: CancellationToken,
    /// Kubernetes-backed stores shared by every kind
    pub stores: Arc<KubeStores>,
    /// Endpoint patterns of every kind
    pub endpoints: Arc<EndpointRegistry>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.is_ready.load(Ordering::Relaxed))
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl InitializationResult {
    /// Build the reconcile context of kind `R` around its client factory
    pub fn context<R: Managed>(
        &self,
        factory: Arc<dyn ClientFactory<R>>,
    ) -> Arc<ReconcileContext<R>> {
        let connector = Connector::new(
            self.stores.clone(),
            self.stores.clone(),
            self.stores.clone(),
            self.endpoints.clone(),
            factory,
        );
        let reconciler = ManagedReconciler::new(
            connector,
            self.stores.clone(),
            self.cancel.clone(),
            self.controller_config.provider_call_timeout(),
        );
        Arc::new(ReconcileContext {
            client: self.client.clone(),
            reconciler,
            config: self.controller_config.clone(),
            requeue: RequeuePolicy::new(self.controller_config.clone()),
        })
    }

    /// Context of the `ProviderConfig` in-use controller
    pub fn provider_config_context(&self) -> Arc<ProviderConfigContext> {
        Arc::new(ProviderConfigContext {
            client: self.client.clone(),
            usages: self.stores.clone(),
            config: self.controller_config.clone(),
        })
    }
}

/// Initialize the controller runtime
///
/// This function handles:
/// - rustls crypto provider setup
/// - Tracing subscriber setup
/// - Metrics registration
/// - HTTP server startup
/// - Kubernetes client creation
pub async fn initialize() -> Result<InitializationResult> {
    // Must run before anything opens a TLS connection
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|e| anyhow::anyhow!("Failed to install rustls crypto provider: {e:?}"))?;

    let controller_config = create_shared_config();
    init_tracing(&controller_config.log_format);

    info!("Starting Alibaba Cloud Provider Controller");
    info!(
        "Build info: timestamp={}, datetime={}, git_hash={}",
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState {
        is_ready: Arc::new(AtomicBool::new(false)),
    });

    let server_state_clone = server_state.clone();
    let server_port = controller_config.metrics_port;
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(&server_state, &server_handle, &controller_config).await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    info!("Controller initialized, starting watch loops...");

    Ok(InitializationResult {
        stores: Arc::new(KubeStores::new(client.clone())),
        endpoints: Arc::new(EndpointRegistry::with_builtin_kinds()),
        client,
        server_state,
        controller_config,
        cancel: CancellationToken::new(),
    })
}

/// Install the global tracing subscriber
///
/// `LOG_FORMAT=json` emits one JSON object per line, anything else plain text.
/// The filter comes from `RUST_LOG`.
fn init_tracing(log_format: &str) {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "alibaba_provider_controller=info".into())
    };
    let result = if log_format.eq_ignore_ascii_case("json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter())
            .try_init()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).try_init()
    };
    if let Err(e) = result {
        warn!("Tracing subscriber already initialized: {}", e);
    }
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    config: &SharedControllerConfig,
) -> Result<()> {
    let startup_timeout = std::time::Duration::from_secs(config.server_startup_timeout_secs);
    let poll_interval = std::time::Duration::from_millis(config.server_poll_interval_ms);
    let start_time = std::time::Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.is_ready.load(Ordering::Relaxed) {
            info!("HTTP server is ready and accepting connections");
            break;
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }

    Ok(())
}

/// Log whether the CRD of kind `R` is installed and how many records exist
///
/// A missing CRD is not fatal: the watch loop keeps retrying until it appears.
pub async fn check_crd_queryable<R: Managed>(client: &Client) {
    let kind = R::kind(&());
    let api: Api<R> = Api::all(client.clone());
    match api.list(&ListParams::default()).await {
        Ok(list) => info!(
            "{} CRD is queryable, found {} existing records",
            kind,
            list.items.len()
        ),
        Err(kube::Error::Api(api_err)) if api_err.code == 404 => warn!(
            "{} CRD is not installed; apply the output of `crdgen` to manage {} records",
            kind, kind
        ),
        Err(e) => warn!("Failed to list {} records: {}", kind, e),
    }
}

//! # Reconciler
//!
//! Core reconciliation logic shared by every managed kind.
//!
//! The reconciler:
//! - Resolves credentials from the record's `ProviderConfig` and its secret
//! - Builds the regional endpoint of the kind
//! - Observes the external resource and creates or updates it as needed
//! - Deletes (or orphans) the external resource when the record is deleted
//! - Reports `Ready` and `Synced` conditions on the record
//!
//! ## Modules
//!
//! - `credentials` - credential resolver and client connection
//! - `endpoint` - kind and region to service endpoint
//! - `managed` - one observe/create/update/delete pass
//! - `provider_config` - in-use guard on `ProviderConfig` deletion
//! - `reconcile` - finalizer and status persistence for kube-runtime
//! - `status` - condition constructors and status reporting
//! - `store` - Kubernetes lookups behind traits
//! - `types` - errors, error classes and requeue policy

pub mod credentials;
pub mod endpoint;
pub mod managed;
pub mod provider_config;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod types;

pub use credentials::{ConnectError, Connector};
pub use endpoint::{build_endpoint, EndpointError, EndpointPattern, EndpointRegistry};
pub use managed::ManagedReconciler;
pub use provider_config::{
    ensure_unused, reconcile_provider_config, ProviderConfigContext, ProviderConfigError,
};
pub use reconcile::reconcile;
pub use store::{
    ConnectionSecretWriter, KubeStores, ProviderConfigStore, SecretStore, StoreError,
    UsageTracker,
};
pub use types::{
    BackoffState, ErrorClass, PassOutcome, ReconcileContext, ReconcilerError, RequeuePolicy,
};

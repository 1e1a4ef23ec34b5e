//! # Prelude
//!
//! Re-exports commonly used types and traits for convenience.
//!
//! ```rust
//! use alibaba_provider_controller::prelude::*;
//! ```
//!
//! This brings into scope:
//! - All CRD types (OSS, Project, ProviderConfig, etc.)
//! - Provider traits (ExternalClient, ClientFactory)
//! - Reconciler types (ManagedReconciler, ReconcilerError, etc.)
//! - Config types (ControllerConfig)

pub use crate::crd::*;

pub use crate::provider::{
    ClientFactory, ConnectionDetails, Credentials, ExternalClient, ExternalState, ProviderError,
};

pub use crate::controller::reconciler::{
    build_endpoint, ConnectError, Connector, EndpointError, EndpointRegistry, ErrorClass,
    ManagedReconciler, ReconcilerError,
};

pub use crate::config::{ControllerConfig, SharedControllerConfig};

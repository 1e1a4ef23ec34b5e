//! Alibaba Cloud Provider Controller Library
//!
//! Reconciles declarative OSS and SLS records against the Alibaba Cloud
//! APIs: resolves credentials from a `ProviderConfig`, observes the external
//! resource, creates or updates it until it matches the record and reports
//! `Ready`/`Synced` conditions back onto the record.
//!
//! ## Quick Start
//!
//! ```rust
//! use alibaba_provider_controller::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod config;
pub mod constants;
pub mod controller;
pub mod crd;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;

//! # Observability
//!
//! Prometheus metrics for the controller. Logging goes through `tracing`,
//! initialized in [`crate::runtime::initialization`].

pub mod metrics;

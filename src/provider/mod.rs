//! # Provider
//!
//! External client adapters for the Alibaba Cloud services. Each managed kind
//! gets a [`ClientFactory`] that turns resolved [`Credentials`] into an
//! [`ExternalClient`]. The client offers the four operations the reconciler
//! drives: observe, create, update and delete.
//!
//! Clients never retry. Retry scheduling belongs to the controller's error
//! policy, which uses [`ProviderError::is_retryable`] to classify failures.
//!
//! ## Modules
//!
//! - `signer` - Alibaba Cloud V4 request signing
//! - `oss` - Object Storage Service buckets (XML REST API)
//! - `sls` - Log Service projects, logstores, indexes and machine groups (JSON REST API)

pub mod oss;
pub mod signer;
pub mod sls;

use crate::crd::Managed;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;

/// Resolved connection input for a client factory
///
/// Built fresh on every reconciliation pass so rotated secrets take effect
/// without a restart.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Regional service endpoint, e.g. `http://oss-cn-hangzhou.aliyuncs.com`
    pub endpoint: String,
    pub region: String,
    pub access_key_id: String,
    pub access_key_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key_id", &self.access_key_id)
            .field("access_key_secret", &"<redacted>")
            .finish()
    }
}

/// Details published to the record's connection secret
pub type ConnectionDetails = BTreeMap<String, String>;

/// What observe saw on the provider side
#[derive(Debug, Clone, PartialEq)]
pub enum ExternalState<O> {
    Absent,
    Present {
        observation: O,
        connection_details: ConnectionDetails,
    },
}

/// Errors returned by provider adapters
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("external resource not found")]
    NotFound,

    #[error("field {field} cannot be changed after creation")]
    Immutable { field: &'static str },

    #[error("credentials rejected: {0}")]
    Unauthenticated(String),

    #[error("request rejected with HTTP {status}: {code}: {message}")]
    Rejected {
        status: u16,
        code: String,
        message: String,
    },

    #[error("cannot reach provider: {0}")]
    Transport(String),

    #[error("cannot decode provider response: {0}")]
    Decode(String),

    #[error("provider call cancelled")]
    Cancelled,

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
}

impl ProviderError {
    /// Whether retrying the same request later can succeed without a spec change
    ///
    /// Network failures, server errors, throttling, timeouts and cancellation
    /// are retryable. So is not-found outside observe and delete: it means a
    /// parent (the project of a logstore, say) does not exist yet. Client-side
    /// rejections are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::NotFound
            | ProviderError::Transport(_)
            | ProviderError::Cancelled
            | ProviderError::Timeout(_) => true,
            ProviderError::Rejected { status, code, .. } => {
                *status >= 500 || *status == 429 || code.contains("Throttling")
            }
            ProviderError::Immutable { .. }
            | ProviderError::Unauthenticated(_)
            | ProviderError::Decode(_) => false,
        }
    }

    /// Whether the error means the external resource does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound)
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(e.to_string())
    }
}

/// Operations on the external resource behind one managed record
#[async_trait]
pub trait ExternalClient<R: Managed>: Send + Sync {
    /// Read the current state of the external resource
    async fn observe(&self, record: &R) -> Result<ExternalState<R::Observation>, ProviderError>;

    /// Create the external resource from the record's desired state
    async fn create(&self, record: &R) -> Result<(), ProviderError>;

    /// Converge the mutable fields of an existing external resource
    async fn update(&self, record: &R, observed: &R::Observation) -> Result<(), ProviderError>;

    /// Delete the external resource. An already-absent resource is success.
    async fn delete(&self, record: &R) -> Result<(), ProviderError>;
}

/// Builds an [`ExternalClient`] from resolved credentials
#[async_trait]
pub trait ClientFactory<R: Managed>: Send + Sync {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExternalClient<R>>, ProviderError>;
}

/// Reject a blank key pair before any request is signed with it
pub(crate) fn ensure_key_pair(credentials: &Credentials) -> Result<(), ProviderError> {
    if credentials.access_key_id.trim().is_empty() || credentials.access_key_secret.trim().is_empty()
    {
        return Err(ProviderError::Unauthenticated(
            "access key pair is empty".to_string(),
        ));
    }
    Ok(())
}

/// Shared HTTP client for all provider adapters
pub(crate) fn http_client() -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .user_agent(concat!("alibaba-provider-controller/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ProviderError::from)
}

//! # Custom Resource Definitions
//!
//! CRD types for the Alibaba Cloud provider controller.
//!
//! ## Module Structure
//!
//! - `common.rs` - Spec and status fields shared by every managed resource
//! - `managed.rs` - Capability traits implemented once for all managed resources
//! - `provider_config.rs` - ProviderConfig and ProviderConfigUsage
//! - `oss.rs` - Object storage bucket
//! - `sls.rs` - Log service project, logstore, index and machine group

mod common;
mod managed;
mod oss;
mod provider_config;
mod sls;

pub use common::{
    Condition, ConditionType, DeletionPolicy, ProviderConfigReference, ResourceSpec,
    ResourceStatus, SecretReference, API_GROUP, API_VERSION,
};
pub use managed::{
    AtProvider, HasConditions, HasConnectionSecretRef, HasDeletionPolicy,
    HasProviderConfigReference, Managed, ManagedParts,
};
pub use oss::{Bucket, OssObservation, OssParameters, OssSpec, OssStatus, OSS};
pub use provider_config::{
    ProviderConfig, ProviderConfigSpec, ProviderConfigUsage, ProviderConfigUsageSpec,
    ProviderCredentials, TypedReference, CREDENTIALS_SOURCE_SECRET, PROVIDER_CONFIG_LABEL,
};
pub use sls::{
    FullTextIndex, KeyIndex, LogStore, LogStoreObservation, LogStoreParameters, LogStoreSpec,
    LogStoreStatus, LogstoreIndex, LogstoreIndexObservation, LogstoreIndexParameters,
    LogstoreIndexSpec, LogstoreIndexStatus, MachineGroup, MachineGroupObservation,
    MachineGroupParameters, MachineGroupSpec, MachineGroupStatus, Project, ProjectObservation,
    ProjectParameters, ProjectSpec, ProjectStatus,
};

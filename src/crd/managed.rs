//! # Managed Resource Capabilities
//!
//! Every managed record composes a [`ResourceSpec`] into its spec and a
//! [`ResourceStatus`] into its status. A record only has to expose those two
//! parts through [`ManagedParts`]; the capability traits the reconciler works
//! with are implemented once, for all records, on top of that.

use super::common::{
    Condition, ConditionType, DeletionPolicy, ProviderConfigReference, ResourceSpec,
    ResourceStatus, SecretReference,
};
use kube::Resource;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

/// Access to the composed common parts of a managed record
pub trait ManagedParts {
    fn resource_spec(&self) -> &ResourceSpec;
    fn resource_status(&self) -> Option<&ResourceStatus>;
    fn resource_status_mut(&mut self) -> &mut ResourceStatus;
    /// `status.atProvider.message`
    fn message(&self) -> Option<&str>;
    fn set_message(&mut self, message: Option<String>);
}

pub trait HasConditions {
    fn condition(&self, condition_type: ConditionType) -> Option<&Condition>;
    fn set_condition(&mut self, condition: Condition);
}

pub trait HasProviderConfigReference {
    fn provider_config_reference(&self) -> Option<&ProviderConfigReference>;
}

pub trait HasDeletionPolicy {
    fn deletion_policy(&self) -> DeletionPolicy;
}

pub trait HasConnectionSecretRef {
    fn write_connection_secret_to_reference(&self) -> Option<&SecretReference>;
}

impl<T: ManagedParts> HasConditions for T {
    fn condition(&self, condition_type: ConditionType) -> Option<&Condition> {
        self.resource_status()
            .and_then(|status| status.condition(condition_type))
    }

    fn set_condition(&mut self, condition: Condition) {
        self.resource_status_mut().set_condition(condition);
    }
}

impl<T: ManagedParts> HasProviderConfigReference for T {
    fn provider_config_reference(&self) -> Option<&ProviderConfigReference> {
        self.resource_spec().provider_config_ref.as_ref()
    }
}

impl<T: ManagedParts> HasDeletionPolicy for T {
    fn deletion_policy(&self) -> DeletionPolicy {
        self.resource_spec().deletion_policy
    }
}

impl<T: ManagedParts> HasConnectionSecretRef for T {
    fn write_connection_secret_to_reference(&self) -> Option<&SecretReference> {
        self.resource_spec().write_connection_secret_to_ref.as_ref()
    }
}

/// Observed state mirrored into `status.atProvider`
pub trait AtProvider {
    type Observation: Clone + Debug + Default + PartialEq + Send + Sync + 'static;

    fn at_provider(&self) -> Option<&Self::Observation>;

    /// Replace the observation, keeping the current message
    fn set_at_provider(&mut self, observation: Self::Observation);
}

/// A desired-state record the reconciler can drive to convergence
///
/// The kind tag used for endpoint and adapter lookup is the Kubernetes kind
/// (`OSS`, `Project`, ...), available through [`Resource::kind`].
pub trait Managed:
    ManagedParts
    + AtProvider
    + Resource<DynamicType = ()>
    + Clone
    + Debug
    + Serialize
    + DeserializeOwned
    + Send
    + Sync
    + 'static
{
    /// Identifier of the external resource, used in logs and error messages
    fn external_name(&self) -> String;

    /// Desired fields that differ from the observation
    ///
    /// Fields left empty in the spec are provider-defaulted and never count
    /// as drift.
    fn drift(&self, observed: &Self::Observation) -> Vec<&'static str>;
}

/// Implement [`ManagedParts`] and [`AtProvider`] for a record whose spec
/// has a `resource` field and whose status has `resource` and `at_provider`
/// fields, the observation carrying a `message`.
macro_rules! managed_resource {
    ($record:ty, $observation:ty) => {
        impl $crate::crd::ManagedParts for $record {
            fn resource_spec(&self) -> &$crate::crd::ResourceSpec {
                &self.spec.resource
            }

            fn resource_status(&self) -> Option<&$crate::crd::ResourceStatus> {
                self.status.as_ref().map(|status| &status.resource)
            }

            fn resource_status_mut(&mut self) -> &mut $crate::crd::ResourceStatus {
                &mut self.status.get_or_insert_with(Default::default).resource
            }

            fn message(&self) -> Option<&str> {
                self.status
                    .as_ref()
                    .and_then(|status| status.at_provider.message.as_deref())
            }

            fn set_message(&mut self, message: Option<String>) {
                self.status
                    .get_or_insert_with(Default::default)
                    .at_provider
                    .message = message;
            }
        }

        impl $crate::crd::AtProvider for $record {
            type Observation = $observation;

            fn at_provider(&self) -> Option<&$observation> {
                self.status.as_ref().map(|status| &status.at_provider)
            }

            fn set_at_provider(&mut self, mut observation: $observation) {
                let status = self.status.get_or_insert_with(Default::default);
                observation.message = status.at_provider.message.take();
                status.at_provider = observation;
            }
        }
    };
}

pub(crate) use managed_resource;

/// Compare a desired optional field against the observed value
///
/// An unset or empty desired value is never drift.
pub(crate) fn field_drifted(desired: Option<&str>, observed: Option<&str>) -> bool {
    match desired {
        Some(want) if !want.is_empty() => observed != Some(want),
        _ => false,
    }
}

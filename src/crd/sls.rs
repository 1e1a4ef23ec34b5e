//! # SLS
//!
//! Managed resources for the Alibaba Cloud Log Service (SLS) family:
//! projects, logstores, logstore indexes and machine groups.

use super::common::{ResourceSpec, ResourceStatus};
use super::managed::{field_drifted, managed_resource, Managed};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Project Custom Resource Definition
///
/// A project is the namespace every other SLS resource lives in.
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "Project",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    status = "ProjectStatus",
    category = "crossplane",
    category = "managed",
    category = "alibaba",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type=='Ready')].status"}, {"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type=='Synced')].status"}, {"name":"WARNING", "type":"string", "jsonPath":".status.atProvider.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: ProjectParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectParameters {
    /// Project name, unique within the region
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,
    #[serde(default)]
    pub at_provider: ProjectObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProjectObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Project status reported by SLS, e.g. "Normal"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

managed_resource!(Project, ProjectObservation);

impl Managed for Project {
    fn external_name(&self) -> String {
        self.spec.for_provider.name.clone()
    }

    fn drift(&self, observed: &ProjectObservation) -> Vec<&'static str> {
        let mut drifted = Vec::new();
        if field_drifted(
            self.spec.for_provider.description.as_deref(),
            observed.description.as_deref(),
        ) {
            drifted.push("description");
        }
        drifted
    }
}

/// LogStore Custom Resource Definition
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "LogStore",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    status = "LogStoreStatus",
    category = "crossplane",
    category = "managed",
    category = "alibaba",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type=='Ready')].status"}, {"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type=='Synced')].status"}, {"name":"WARNING", "type":"string", "jsonPath":".status.atProvider.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LogStoreSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: LogStoreParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogStoreParameters {
    pub project_name: String,
    pub logstore_name: String,
    /// Retention in days
    pub ttl: i32,
    /// Number of shards at creation. Shards change afterwards only by splitting.
    pub shard_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_split: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_split_shard: Option<i32>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogStoreStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,
    #[serde(default)]
    pub at_provider: LogStoreObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogStoreObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logstore_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shard_count: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_split: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_split_shard: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

managed_resource!(LogStore, LogStoreObservation);

impl Managed for LogStore {
    fn external_name(&self) -> String {
        format!(
            "{}/{}",
            self.spec.for_provider.project_name, self.spec.for_provider.logstore_name
        )
    }

    fn drift(&self, observed: &LogStoreObservation) -> Vec<&'static str> {
        let params = &self.spec.for_provider;
        let mut drifted = Vec::new();
        if observed.ttl != Some(params.ttl) {
            drifted.push("ttl");
        }
        if params.auto_split.is_some() && observed.auto_split != params.auto_split {
            drifted.push("autoSplit");
        }
        if params.max_split_shard.is_some() && observed.max_split_shard != params.max_split_shard
        {
            drifted.push("maxSplitShard");
        }
        drifted
    }
}

/// LogstoreIndex Custom Resource Definition
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "LogstoreIndex",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    status = "LogstoreIndexStatus",
    category = "crossplane",
    category = "managed",
    category = "alibaba",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type=='Ready')].status"}, {"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type=='Synced')].status"}, {"name":"WARNING", "type":"string", "jsonPath":".status.atProvider.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct LogstoreIndexSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: LogstoreIndexParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogstoreIndexParameters {
    pub project_name: String,
    pub logstore_name: String,
    /// Full-text index over the whole log line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<FullTextIndex>,
    /// Field indexes keyed by field name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<BTreeMap<String, KeyIndex>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct FullTextIndex {
    #[serde(default)]
    pub case_sensitive: bool,
    /// Delimiters
    #[serde(default)]
    pub token: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct KeyIndex {
    /// text, long, double or json
    pub r#type: String,
    #[serde(default)]
    pub token: Vec<String>,
    #[serde(default)]
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogstoreIndexStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,
    #[serde(default)]
    pub at_provider: LogstoreIndexObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogstoreIndexObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_text: Option<FullTextIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keys: Option<BTreeMap<String, KeyIndex>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

managed_resource!(LogstoreIndex, LogstoreIndexObservation);

impl Managed for LogstoreIndex {
    fn external_name(&self) -> String {
        format!(
            "{}/{}/index",
            self.spec.for_provider.project_name, self.spec.for_provider.logstore_name
        )
    }

    fn drift(&self, observed: &LogstoreIndexObservation) -> Vec<&'static str> {
        let params = &self.spec.for_provider;
        let mut drifted = Vec::new();
        if params.full_text.is_some() && params.full_text != observed.full_text {
            drifted.push("fullText");
        }
        if params.keys.is_some() && params.keys != observed.keys {
            drifted.push("keys");
        }
        drifted
    }
}

/// MachineGroup Custom Resource Definition
#[derive(CustomResource, Debug, Clone, Deserialize, Serialize, JsonSchema)]
#[kube(
    kind = "MachineGroup",
    group = "alibaba.crossplane.io",
    version = "v1alpha1",
    status = "MachineGroupStatus",
    category = "crossplane",
    category = "managed",
    category = "alibaba",
    printcolumn = r#"{"name":"READY", "type":"string", "jsonPath":".status.conditions[?(@.type=='Ready')].status"}, {"name":"SYNCED", "type":"string", "jsonPath":".status.conditions[?(@.type=='Synced')].status"}, {"name":"WARNING", "type":"string", "jsonPath":".status.atProvider.message"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MachineGroupSpec {
    #[serde(flatten)]
    pub resource: ResourceSpec,
    pub for_provider: MachineGroupParameters,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineGroupParameters {
    pub project_name: String,
    pub name: String,
    /// "ip" or "userdefined"
    pub machine_identify_type: String,
    /// IP addresses or custom identifiers, depending on the identify type
    #[serde(default)]
    pub machine_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_topic: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineGroupStatus {
    #[serde(flatten)]
    pub resource: ResourceStatus,
    #[serde(default)]
    pub at_provider: MachineGroupObservation,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MachineGroupObservation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_identify_type: Option<String>,
    #[serde(default)]
    pub machine_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

managed_resource!(MachineGroup, MachineGroupObservation);

impl Managed for MachineGroup {
    fn external_name(&self) -> String {
        format!(
            "{}/{}",
            self.spec.for_provider.project_name, self.spec.for_provider.name
        )
    }

    fn drift(&self, observed: &MachineGroupObservation) -> Vec<&'static str> {
        let params = &self.spec.for_provider;
        let mut drifted = Vec::new();
        if field_drifted(
            Some(params.machine_identify_type.as_str()),
            observed.machine_identify_type.as_deref(),
        ) {
            drifted.push("machineIdentifyType");
        }
        // SLS does not preserve machine list order
        let mut desired = params.machine_list.clone();
        let mut actual = observed.machine_list.clone();
        desired.sort();
        actual.sort();
        if desired != actual {
            drifted.push("machineList");
        }
        if field_drifted(params.group_type.as_deref(), observed.group_type.as_deref()) {
            drifted.push("groupType");
        }
        if field_drifted(params.group_topic.as_deref(), observed.group_topic.as_deref()) {
            drifted.push("groupTopic");
        }
        drifted
    }
}

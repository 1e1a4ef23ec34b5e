//! MachineGroup operations: `GET|PUT|DELETE /machinegroups/{name}`, `POST /machinegroups`.

use super::client::SlsClient;
use crate::crd::{MachineGroup, MachineGroupObservation};
use crate::provider::{ConnectionDetails, ExternalClient, ExternalState, ProviderError};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct GroupAttribute {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_topic: Option<String>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
struct MachineGroupDocument {
    group_name: String,
    #[serde(default)]
    machine_identify_type: Option<String>,
    #[serde(default)]
    machine_list: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    group_type: Option<String>,
    #[serde(default)]
    group_attribute: GroupAttribute,
}

impl From<&MachineGroup> for MachineGroupDocument {
    fn from(record: &MachineGroup) -> Self {
        let params = &record.spec.for_provider;
        Self {
            group_name: params.name.clone(),
            machine_identify_type: Some(params.machine_identify_type.clone()),
            machine_list: params.machine_list.clone(),
            group_type: params.group_type.clone(),
            group_attribute: GroupAttribute {
                group_topic: params.group_topic.clone(),
            },
        }
    }
}

fn group_path(record: &MachineGroup) -> String {
    format!("/machinegroups/{}", record.spec.for_provider.name)
}

#[async_trait]
impl ExternalClient<MachineGroup> for SlsClient {
    async fn observe(
        &self,
        record: &MachineGroup,
    ) -> Result<ExternalState<MachineGroupObservation>, ProviderError> {
        let Some(group) = self
            .get_json::<MachineGroupDocument>(
                &record.spec.for_provider.project_name,
                &group_path(record),
            )
            .await?
        else {
            return Ok(ExternalState::Absent);
        };

        Ok(ExternalState::Present {
            observation: MachineGroupObservation {
                machine_identify_type: group.machine_identify_type,
                machine_list: group.machine_list,
                // SLS reports an empty string for an unset group type
                group_type: group.group_type.filter(|t| !t.is_empty()),
                group_topic: group.group_attribute.group_topic,
                message: None,
            },
            connection_details: ConnectionDetails::new(),
        })
    }

    async fn create(&self, record: &MachineGroup) -> Result<(), ProviderError> {
        self.send(
            Method::POST,
            &record.spec.for_provider.project_name,
            "/machinegroups",
            Some(&MachineGroupDocument::from(record)),
        )
        .await
        .map(|_| ())
    }

    async fn update(
        &self,
        record: &MachineGroup,
        _observed: &MachineGroupObservation,
    ) -> Result<(), ProviderError> {
        self.send(
            Method::PUT,
            &record.spec.for_provider.project_name,
            &group_path(record),
            Some(&MachineGroupDocument::from(record)),
        )
        .await
        .map(|_| ())
    }

    async fn delete(&self, record: &MachineGroup) -> Result<(), ProviderError> {
        self.delete_path(&record.spec.for_provider.project_name, &group_path(record))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::client;
    use super::*;
    use crate::crd::{MachineGroupParameters, MachineGroupSpec, ResourceSpec};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_observe_reads_group_attribute() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/machinegroups/nodes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "groupName": "nodes",
                "groupType": "",
                "groupAttribute": { "externalName": "", "groupTopic": "k8s" },
                "machineIdentifyType": "ip",
                "machineList": ["10.0.0.1"],
                "createTime": 1_700_000_000
            })))
            .mount(&server)
            .await;

        let record = MachineGroup::new(
            "nodes",
            MachineGroupSpec {
                resource: ResourceSpec::default(),
                for_provider: MachineGroupParameters {
                    project_name: "p1".to_string(),
                    name: "nodes".to_string(),
                    machine_identify_type: "ip".to_string(),
                    machine_list: vec!["10.0.0.1".to_string()],
                    group_type: None,
                    group_topic: Some("k8s".to_string()),
                },
            },
        );

        let ExternalState::Present { observation, .. } =
            client(&server.uri()).observe(&record).await.unwrap()
        else {
            panic!("expected machine group to be present");
        };
        assert_eq!(observation.group_topic.as_deref(), Some("k8s"));
        assert!(observation.group_type.is_none());
        assert!(crate::crd::Managed::drift(&record, &observation).is_empty());
    }
}

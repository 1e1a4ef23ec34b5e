//! Project operations: `GET|POST|PUT|DELETE /` on the project host.

use super::client::SlsClient;
use crate::crd::{Project, ProjectObservation};
use crate::provider::{ConnectionDetails, ExternalClient, ExternalState, ProviderError};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProjectResponse {
    #[serde(default)]
    project_name: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    region: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateProjectRequest<'a> {
    project_name: &'a str,
    description: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdateProjectRequest<'a> {
    description: &'a str,
}

#[async_trait]
impl ExternalClient<Project> for SlsClient {
    async fn observe(
        &self,
        record: &Project,
    ) -> Result<ExternalState<ProjectObservation>, ProviderError> {
        let name = &record.spec.for_provider.name;
        let Some(project) = self.get_json::<ProjectResponse>(name, "/").await? else {
            return Ok(ExternalState::Absent);
        };

        let mut connection_details = ConnectionDetails::new();
        connection_details.insert("project".to_string(), name.clone());

        Ok(ExternalState::Present {
            observation: ProjectObservation {
                name: project.project_name,
                description: project.description,
                status: project.status,
                region: project.region,
                message: None,
            },
            connection_details,
        })
    }

    async fn create(&self, record: &Project) -> Result<(), ProviderError> {
        let params = &record.spec.for_provider;
        let body = CreateProjectRequest {
            project_name: &params.name,
            description: params.description.as_deref().unwrap_or_default(),
        };
        self.send(Method::POST, &params.name, "/", Some(&body))
            .await
            .map(|_| ())
    }

    async fn update(
        &self,
        record: &Project,
        _observed: &ProjectObservation,
    ) -> Result<(), ProviderError> {
        let params = &record.spec.for_provider;
        let body = UpdateProjectRequest {
            description: params.description.as_deref().unwrap_or_default(),
        };
        self.send(Method::PUT, &params.name, "/", Some(&body))
            .await
            .map(|_| ())
    }

    async fn delete(&self, record: &Project) -> Result<(), ProviderError> {
        self.delete_path(&record.spec.for_provider.name, "/").await
    }
}

#[cfg(test)]
mod tests {
    use super::super::client::test_support::client;
    use super::*;
    use crate::crd::{ProjectParameters, ProjectSpec, ResourceSpec};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn project() -> Project {
        Project::new(
            "p1",
            ProjectSpec {
                resource: ResourceSpec::default(),
                for_provider: ProjectParameters {
                    name: "p1".to_string(),
                    description: Some("audit logs".to_string()),
                },
            },
        )
    }

    #[tokio::test]
    async fn test_observe_missing_project_is_absent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "errorCode": "ProjectNotExist",
                "errorMessage": "The Project does not exist : p1"
            })))
            .mount(&server)
            .await;

        let state = client(&server.uri()).observe(&project()).await.unwrap();
        assert_eq!(state, ExternalState::Absent);
    }

    #[tokio::test]
    async fn test_observe_existing_project() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "projectName": "p1",
                "description": "audit logs",
                "status": "Normal",
                "region": "cn-hangzhou",
                "owner": "1234"
            })))
            .mount(&server)
            .await;

        let ExternalState::Present { observation, .. } =
            client(&server.uri()).observe(&project()).await.unwrap()
        else {
            panic!("expected project to be present");
        };
        assert_eq!(observation.status.as_deref(), Some("Normal"));
        assert_eq!(observation.description, project().spec.for_provider.description);
    }
}

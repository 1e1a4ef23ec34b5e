//! LogStore operations: `GET|PUT|DELETE /logstores/{name}`, `POST /logstores`.

use super::client::SlsClient;
use crate::crd::{LogStore, LogStoreObservation};
use crate::provider::{ConnectionDetails, ExternalClient, ExternalState, ProviderError};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogStoreResponse {
    #[serde(default)]
    logstore_name: Option<String>,
    #[serde(default)]
    ttl: Option<i32>,
    #[serde(default)]
    shard_count: Option<i32>,
    #[serde(default)]
    auto_split: Option<bool>,
    #[serde(default)]
    max_split_shard: Option<i32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LogStoreRequest<'a> {
    logstore_name: &'a str,
    ttl: i32,
    shard_count: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    auto_split: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_split_shard: Option<i32>,
}

impl<'a> From<&'a LogStore> for LogStoreRequest<'a> {
    fn from(record: &'a LogStore) -> Self {
        let params = &record.spec.for_provider;
        Self {
            logstore_name: &params.logstore_name,
            ttl: params.ttl,
            shard_count: params.shard_count,
            auto_split: params.auto_split,
            max_split_shard: params.max_split_shard,
        }
    }
}

fn logstore_path(record: &LogStore) -> String {
    format!("/logstores/{}", record.spec.for_provider.logstore_name)
}

#[async_trait]
impl ExternalClient<LogStore> for SlsClient {
    async fn observe(
        &self,
        record: &LogStore,
    ) -> Result<ExternalState<LogStoreObservation>, ProviderError> {
        let params = &record.spec.for_provider;
        let Some(logstore) = self
            .get_json::<LogStoreResponse>(&params.project_name, &logstore_path(record))
            .await?
        else {
            return Ok(ExternalState::Absent);
        };

        let mut connection_details = ConnectionDetails::new();
        connection_details.insert("project".to_string(), params.project_name.clone());
        connection_details.insert("logstore".to_string(), params.logstore_name.clone());

        Ok(ExternalState::Present {
            observation: LogStoreObservation {
                logstore_name: logstore.logstore_name,
                ttl: logstore.ttl,
                shard_count: logstore.shard_count,
                auto_split: logstore.auto_split,
                max_split_shard: logstore.max_split_shard,
                message: None,
            },
            connection_details,
        })
    }

    async fn create(&self, record: &LogStore) -> Result<(), ProviderError> {
        let body = LogStoreRequest::from(record);
        self.send(
            Method::POST,
            &record.spec.for_provider.project_name,
            "/logstores",
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn update(
        &self,
        record: &LogStore,
        _observed: &LogStoreObservation,
    ) -> Result<(), ProviderError> {
        let body = LogStoreRequest::from(record);
        self.send(
            Method::PUT,
            &record.spec.for_provider.project_name,
            &logstore_path(record),
            Some(&body),
        )
        .await
        .map(|_| ())
    }

    async fn delete(&self, record: &LogStore) -> Result<(), ProviderError> {
        self.delete_path(&record.spec.for_provider.project_name, &logstore_path(record))
            .await
    }
}

//! LogstoreIndex operations: `GET|POST|PUT|DELETE /logstores/{name}/index`.

use super::client::SlsClient;
use crate::crd::{FullTextIndex, KeyIndex, LogstoreIndex, LogstoreIndexObservation};
use crate::provider::{ConnectionDetails, ExternalClient, ExternalState, ProviderError};
use async_trait::async_trait;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index document as SLS stores it. The full-text part is called `line`.
#[derive(Debug, Default, Deserialize, Serialize)]
struct IndexDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    line: Option<FullTextIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    keys: Option<BTreeMap<String, KeyIndex>>,
}

impl From<&LogstoreIndex> for IndexDocument {
    fn from(record: &LogstoreIndex) -> Self {
        let params = &record.spec.for_provider;
        Self {
            line: params.full_text.clone(),
            keys: params.keys.clone(),
        }
    }
}

fn index_path(record: &LogstoreIndex) -> String {
    format!("/logstores/{}/index", record.spec.for_provider.logstore_name)
}

#[async_trait]
impl ExternalClient<LogstoreIndex> for SlsClient {
    async fn observe(
        &self,
        record: &LogstoreIndex,
    ) -> Result<ExternalState<LogstoreIndexObservation>, ProviderError> {
        let Some(index) = self
            .get_json::<IndexDocument>(&record.spec.for_provider.project_name, &index_path(record))
            .await?
        else {
            return Ok(ExternalState::Absent);
        };

        Ok(ExternalState::Present {
            observation: LogstoreIndexObservation {
                full_text: index.line,
                keys: index.keys,
                message: None,
            },
            connection_details: ConnectionDetails::new(),
        })
    }

    async fn create(&self, record: &LogstoreIndex) -> Result<(), ProviderError> {
        self.send(
            Method::POST,
            &record.spec.for_provider.project_name,
            &index_path(record),
            Some(&IndexDocument::from(record)),
        )
        .await
        .map(|_| ())
    }

    async fn update(
        &self,
        record: &LogstoreIndex,
        _observed: &LogstoreIndexObservation,
    ) -> Result<(), ProviderError> {
        self.send(
            Method::PUT,
            &record.spec.for_provider.project_name,
            &index_path(record),
            Some(&IndexDocument::from(record)),
        )
        .await
        .map(|_| ())
    }

    async fn delete(&self, record: &LogstoreIndex) -> Result<(), ProviderError> {
        self.delete_path(&record.spec.for_provider.project_name, &index_path(record))
            .await
    }
}

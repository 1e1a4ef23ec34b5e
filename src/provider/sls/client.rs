//! Signed JSON transport shared by the SLS kinds.

use crate::crd::Managed;
use crate::provider::signer::{self, CanonicalRequest, Product, Signer};
use crate::provider::{
    ensure_key_pair, http_client, ClientFactory, Credentials, ExternalClient, ProviderError,
};
use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

const API_VERSION: &str = "0.6.0";

/// Error codes meaning the addressed object does not exist
const NOT_FOUND_CODES: &[&str] = &[
    "ProjectNotExist",
    "LogStoreNotExist",
    "IndexConfigNotExist",
    "MachineGroupNotExist",
];

/// Body of every non-2xx SLS response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    error_message: String,
}

/// Creates [`SlsClient`]s sharing one HTTP connection pool
#[derive(Debug, Clone)]
pub struct SlsClientFactory {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl SlsClientFactory {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client()?,
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of the project's virtual host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

#[async_trait]
impl<R> ClientFactory<R> for SlsClientFactory
where
    R: Managed,
    SlsClient: ExternalClient<R>,
{
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExternalClient<R>>, ProviderError> {
        ensure_key_pair(credentials)?;
        Ok(Box::new(SlsClient {
            http: self.http.clone(),
            signer: Signer::new(
                Product::Sls,
                &credentials.access_key_id,
                &credentials.access_key_secret,
                &credentials.region,
            ),
            endpoint: credentials.endpoint.clone(),
            base_url: self.base_url.clone(),
        }))
    }
}

/// Log Service operations against one regional endpoint
#[derive(Debug)]
pub struct SlsClient {
    http: reqwest::Client,
    signer: Signer,
    endpoint: String,
    base_url: Option<String>,
}

impl SlsClient {
    fn project_url(&self, project: &str) -> String {
        if let Some(base) = &self.base_url {
            return base.clone();
        }
        match self.endpoint.split_once("://") {
            Some((scheme, host)) => format!("{scheme}://{project}.{host}"),
            None => format!("http://{project}.{}", self.endpoint),
        }
    }

    /// Send a request and return the raw response body
    pub(super) async fn send<B: Serialize + ?Sized>(
        &self,
        method: Method,
        project: &str,
        path: &str,
        body: Option<&B>,
    ) -> Result<String, ProviderError> {
        let payload = match body {
            Some(body) => {
                serde_json::to_vec(body).map_err(|e| ProviderError::Decode(e.to_string()))?
            }
            None => Vec::new(),
        };

        let now = chrono::Utc::now();
        let payload_hash = signer::payload_hash(&payload);
        let mut headers = BTreeMap::new();
        headers.insert("x-log-apiversion".to_string(), API_VERSION.to_string());
        headers.insert("x-log-bodyrawsize".to_string(), payload.len().to_string());
        headers.insert("x-log-date".to_string(), signer::format_timestamp(now));
        headers.insert("x-log-content-sha256".to_string(), payload_hash.clone());
        if body.is_some() {
            headers.insert("content-type".to_string(), "application/json".to_string());
        }

        let authorization = self.signer.authorization(
            &CanonicalRequest {
                method: method.as_str(),
                path,
                query: &[],
                headers: &headers,
                payload_hash: &payload_hash,
            },
            now,
        );

        let url = format!("{}{path}", self.project_url(project));
        debug!(method = %method, url = url.as_str(), "sls.request");
        let mut request = self
            .http
            .request(method, &url)
            .header("authorization", authorization);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if body.is_some() {
            request = request.body(payload);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }

        let error: ErrorResponse = serde_json::from_str(&text).unwrap_or_default();
        if NOT_FOUND_CODES.contains(&error.error_code.as_str()) {
            return Err(ProviderError::NotFound);
        }
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            code: if error.error_code.is_empty() {
                status.to_string()
            } else {
                error.error_code
            },
            message: error.error_message,
        })
    }

    /// GET a JSON document, mapping not-found to `None`
    pub(super) async fn get_json<T: DeserializeOwned>(
        &self,
        project: &str,
        path: &str,
    ) -> Result<Option<T>, ProviderError> {
        match self.send::<()>(Method::GET, project, path, None).await {
            Ok(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| ProviderError::Decode(e.to_string())),
            Err(ProviderError::NotFound) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// DELETE, treating an already-absent object as deleted
    pub(super) async fn delete_path(&self, project: &str, path: &str) -> Result<(), ProviderError> {
        match self.send::<()>(Method::DELETE, project, path, None).await {
            Ok(_) | Err(ProviderError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
pub(super) mod test_support {
    use super::*;

    pub fn client(base_url: &str) -> SlsClient {
        SlsClient {
            http: reqwest::Client::new(),
            signer: Signer::new(Product::Sls, "id", "secret", "cn-hangzhou"),
            endpoint: "http://cn-hangzhou.log.aliyuncs.com".to_string(),
            base_url: Some(base_url.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_url_is_virtual_hosted() {
        let client = SlsClient {
            http: reqwest::Client::new(),
            signer: Signer::new(Product::Sls, "id", "secret", "cn-hangzhou"),
            endpoint: "http://cn-hangzhou.log.aliyuncs.com".to_string(),
            base_url: None,
        };
        assert_eq!(
            client.project_url("p1"),
            "http://p1.cn-hangzhou.log.aliyuncs.com"
        );
    }
}

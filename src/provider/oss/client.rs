//! OSS bucket client.

use super::types::{BucketInfoResponse, CreateBucketConfiguration, ErrorResponse};
use crate::crd::{Managed, OssObservation, OSS};
use crate::provider::signer::{self, CanonicalRequest, Product, Signer, UNSIGNED_PAYLOAD};
use crate::provider::{
    ensure_key_pair, http_client, ClientFactory, ConnectionDetails, Credentials, ExternalClient,
    ExternalState, ProviderError,
};
use async_trait::async_trait;
use reqwest::Method;
use std::collections::BTreeMap;
use tracing::debug;

const NO_SUCH_BUCKET: &str = "NoSuchBucket";

/// Creates [`OssClient`]s sharing one HTTP connection pool
#[derive(Debug, Clone)]
pub struct OssClientFactory {
    http: reqwest::Client,
    base_url: Option<String>,
}

impl OssClientFactory {
    pub fn new() -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client()?,
            base_url: None,
        })
    }

    /// Send every request to `base_url` instead of the bucket's virtual host
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }
}

#[async_trait]
impl ClientFactory<OSS> for OssClientFactory {
    async fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ExternalClient<OSS>>, ProviderError> {
        ensure_key_pair(credentials)?;
        Ok(Box::new(OssClient {
            http: self.http.clone(),
            signer: Signer::new(
                Product::Oss,
                &credentials.access_key_id,
                &credentials.access_key_secret,
                &credentials.region,
            ),
            endpoint: credentials.endpoint.clone(),
            base_url: self.base_url.clone(),
        }))
    }
}

/// Bucket operations against one regional OSS endpoint
#[derive(Debug)]
pub struct OssClient {
    http: reqwest::Client,
    signer: Signer,
    endpoint: String,
    base_url: Option<String>,
}

impl OssClient {
    fn bucket_url(&self, bucket: &str) -> String {
        if let Some(base) = &self.base_url {
            return base.clone();
        }
        match self.endpoint.split_once("://") {
            Some((scheme, host)) => format!("{scheme}://{bucket}.{host}"),
            None => format!("http://{bucket}.{}", self.endpoint),
        }
    }

    async fn send(
        &self,
        method: Method,
        bucket: &str,
        query: &[(&str, &str)],
        mut headers: BTreeMap<String, String>,
        body: Option<String>,
    ) -> Result<String, ProviderError> {
        let now = chrono::Utc::now();
        headers.insert(
            "x-oss-date".to_string(),
            signer::format_timestamp(now),
        );
        headers.insert(
            "x-oss-content-sha256".to_string(),
            UNSIGNED_PAYLOAD.to_string(),
        );
        if body.is_some() {
            headers.insert("content-type".to_string(), "application/xml".to_string());
        }

        let resource = format!("/{bucket}/");
        let authorization = self.signer.authorization(
            &CanonicalRequest {
                method: method.as_str(),
                path: &resource,
                query,
                headers: &headers,
                payload_hash: UNSIGNED_PAYLOAD,
            },
            now,
        );

        let mut url = format!("{}/", self.bucket_url(bucket));
        if !query.is_empty() {
            let rendered: Vec<String> = query
                .iter()
                .map(|(k, v)| {
                    if v.is_empty() {
                        (*k).to_string()
                    } else {
                        format!("{k}={v}")
                    }
                })
                .collect();
            url = format!("{url}?{}", rendered.join("&"));
        }

        debug!(method = %method, url = url.as_str(), "oss.request");
        let mut request = self
            .http
            .request(method, &url)
            .header("authorization", authorization);
        for (name, value) in &headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;
        if status.is_success() {
            return Ok(text);
        }

        let error: ErrorResponse = quick_xml::de::from_str(&text).unwrap_or_default();
        if status == reqwest::StatusCode::NOT_FOUND || error.code == NO_SUCH_BUCKET {
            return Err(ProviderError::NotFound);
        }
        Err(ProviderError::Rejected {
            status: status.as_u16(),
            code: if error.code.is_empty() {
                status.to_string()
            } else {
                error.code
            },
            message: error.message,
        })
    }

    async fn put_acl(&self, bucket: &str, acl: &str) -> Result<(), ProviderError> {
        let mut headers = BTreeMap::new();
        headers.insert("x-oss-acl".to_string(), acl.to_string());
        self.send(Method::PUT, bucket, &[("acl", "")], headers, None)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl ExternalClient<OSS> for OssClient {
    async fn observe(&self, record: &OSS) -> Result<ExternalState<OssObservation>, ProviderError> {
        let bucket = record.external_name();
        let body = match self
            .send(
                Method::GET,
                &bucket,
                &[("bucketInfo", "")],
                BTreeMap::new(),
                None,
            )
            .await
        {
            Ok(body) => body,
            Err(ProviderError::NotFound) => return Ok(ExternalState::Absent),
            Err(e) => return Err(e),
        };

        let info: BucketInfoResponse = quick_xml::de::from_str(&body)
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        let info = info.bucket;

        let mut connection_details = ConnectionDetails::new();
        if let Some(endpoint) = &info.extranet_endpoint {
            connection_details.insert("extranetEndpoint".to_string(), endpoint.clone());
        }
        if let Some(endpoint) = &info.intranet_endpoint {
            connection_details.insert("intranetEndpoint".to_string(), endpoint.clone());
        }

        Ok(ExternalState::Present {
            observation: OssObservation {
                bucket_name: info.name,
                acl: info.access_control_list.and_then(|acl| acl.grant),
                storage_class: info.storage_class,
                redundancy_type: info.data_redundancy_type,
                extranet_endpoint: info.extranet_endpoint,
                intranet_endpoint: info.intranet_endpoint,
                message: None,
            },
            connection_details,
        })
    }

    async fn create(&self, record: &OSS) -> Result<(), ProviderError> {
        let bucket = &record.spec.for_provider.bucket;
        let mut headers = BTreeMap::new();
        if let Some(acl) = bucket.acl.as_deref().filter(|acl| !acl.is_empty()) {
            headers.insert("x-oss-acl".to_string(), acl.to_string());
        }
        let body = quick_xml::se::to_string(&CreateBucketConfiguration {
            storage_class: bucket.storage_class.clone().filter(|s| !s.is_empty()),
            data_redundancy_type: bucket.data_redundancy_type.clone().filter(|s| !s.is_empty()),
        })
        .map_err(|e| ProviderError::Decode(e.to_string()))?;

        self.send(Method::PUT, &bucket.name, &[], headers, Some(body))
            .await
            .map(|_| ())
    }

    async fn update(&self, record: &OSS, observed: &OssObservation) -> Result<(), ProviderError> {
        let drifted = record.drift(observed);
        if drifted.contains(&"storageClass") {
            return Err(ProviderError::Immutable {
                field: "storageClass",
            });
        }
        if drifted.contains(&"dataRedundancyType") {
            return Err(ProviderError::Immutable {
                field: "dataRedundancyType",
            });
        }
        if drifted.contains(&"acl") {
            if let Some(acl) = record.spec.for_provider.bucket.acl.as_deref() {
                self.put_acl(&record.external_name(), acl).await?;
            }
        }
        Ok(())
    }

    async fn delete(&self, record: &OSS) -> Result<(), ProviderError> {
        match self
            .send(
                Method::DELETE,
                &record.external_name(),
                &[],
                BTreeMap::new(),
                None,
            )
            .await
        {
            Ok(_) | Err(ProviderError::NotFound) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(endpoint: &str) -> OssClient {
        OssClient {
            http: reqwest::Client::new(),
            signer: Signer::new(Product::Oss, "id", "secret", "cn-hangzhou"),
            endpoint: endpoint.to_string(),
            base_url: None,
        }
    }

    #[test]
    fn test_bucket_url_is_virtual_hosted() {
        assert_eq!(
            client("http://oss-cn-hangzhou.aliyuncs.com").bucket_url("b1"),
            "http://b1.oss-cn-hangzhou.aliyuncs.com"
        );
    }

    #[test]
    fn test_base_url_overrides_virtual_host() {
        let mut client = client("http://oss-cn-hangzhou.aliyuncs.com");
        client.base_url = Some("http://127.0.0.1:9000".to_string());
        assert_eq!(client.bucket_url("b1"), "http://127.0.0.1:9000");
    }
}

//! XML bodies of the OSS bucket API.

use serde::{Deserialize, Serialize};

/// `GET /?bucketInfo`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BucketInfoResponse {
    pub bucket: BucketInfo,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct BucketInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub storage_class: Option<String>,
    #[serde(default)]
    pub data_redundancy_type: Option<String>,
    #[serde(default)]
    pub extranet_endpoint: Option<String>,
    #[serde(default)]
    pub intranet_endpoint: Option<String>,
    #[serde(default)]
    pub access_control_list: Option<AccessControlList>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct AccessControlList {
    #[serde(default)]
    pub grant: Option<String>,
}

/// Body of every non-2xx OSS response
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct ErrorResponse {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// `PUT /` body
#[derive(Debug, Serialize)]
#[serde(rename = "CreateBucketConfiguration", rename_all = "PascalCase")]
pub(crate) struct CreateBucketConfiguration {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_redundancy_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_info_parses() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<BucketInfo>
  <Bucket>
    <CreationDate>2024-03-01T08:30:00.000Z</CreationDate>
    <ExtranetEndpoint>oss-cn-hangzhou.aliyuncs.com</ExtranetEndpoint>
    <IntranetEndpoint>oss-cn-hangzhou-internal.aliyuncs.com</IntranetEndpoint>
    <Location>oss-cn-hangzhou</Location>
    <StorageClass>Standard</StorageClass>
    <DataRedundancyType>LRS</DataRedundancyType>
    <Name>b1</Name>
    <AccessControlList>
      <Grant>private</Grant>
    </AccessControlList>
  </Bucket>
</BucketInfo>"#;

        let info: BucketInfoResponse = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(info.bucket.name.as_deref(), Some("b1"));
        assert_eq!(info.bucket.storage_class.as_deref(), Some("Standard"));
        assert_eq!(
            info.bucket
                .access_control_list
                .and_then(|acl| acl.grant)
                .as_deref(),
            Some("private")
        );
    }

    #[test]
    fn test_error_parses() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
  <Code>NoSuchBucket</Code>
  <Message>The specified bucket does not exist.</Message>
  <RequestId>5C3D9175B6FC201293AD****</RequestId>
  <BucketName>b1</BucketName>
</Error>"#;
        let error: ErrorResponse = quick_xml::de::from_str(xml).unwrap();
        assert_eq!(error.code, "NoSuchBucket");
    }

    #[test]
    fn test_create_configuration_omits_unset_fields() {
        let body = quick_xml::se::to_string(&CreateBucketConfiguration {
            storage_class: Some("IA".to_string()),
            data_redundancy_type: None,
        })
        .unwrap();
        assert_eq!(
            body,
            "<CreateBucketConfiguration><StorageClass>IA</StorageClass></CreateBucketConfiguration>"
        );
    }
}

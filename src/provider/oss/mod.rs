//! # OSS
//!
//! Object Storage Service adapter. Buckets are addressed virtual-host style
//! (`http://{bucket}.oss-{region}.aliyuncs.com`) and the API speaks XML.
//!
//! Only the ACL of an existing bucket can be changed. A spec that asks for a
//! different storage class or redundancy type is rejected as immutable.

mod client;
mod types;

pub use client::{OssClient, OssClientFactory};

//! # Endpoint Builder
//!
//! Maps a managed kind and a region to the regional service endpoint.
//!
//! Endpoints are `http://` + prefix + region + suffix + `.aliyuncs.com`:
//!
//! | Family | Prefix | Suffix | Example |
//! |--------|--------|--------|---------|
//! | OSS    | `oss-` |        | `http://oss-cn-hangzhou.aliyuncs.com` |
//! | SLS    |        | `.log` | `http://cn-hangzhou.log.aliyuncs.com` |

use crate::constants::DOMAIN;
use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
    #[error("region is not valid")]
    InvalidRegion,

    #[error("cloud resource is not supported: {0}")]
    UnsupportedResourceKind(String),
}

/// Subdomain pattern of one service family
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointPattern {
    pub prefix: String,
    pub suffix: String,
}

impl EndpointPattern {
    #[must_use]
    pub fn new(prefix: &str, suffix: &str) -> Self {
        Self {
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        }
    }

    fn render(&self, region: &str) -> String {
        format!("http://{}{region}{}.{DOMAIN}", self.prefix, self.suffix)
    }
}

/// Closed table from kind tag to endpoint pattern
///
/// Unknown kinds are an error, never a default.
#[derive(Debug, Clone, Default)]
pub struct EndpointRegistry {
    patterns: HashMap<String, EndpointPattern>,
}

impl EndpointRegistry {
    /// Registry with every kind this controller manages
    #[must_use]
    pub fn with_builtin_kinds() -> Self {
        let oss = EndpointPattern::new("oss-", "");
        let sls = EndpointPattern::new("", ".log");
        let mut registry = Self::default();
        registry.register("OSS", oss);
        for kind in ["Project", "LogStore", "LogstoreIndex", "MachineGroup"] {
            registry.register(kind, sls.clone());
        }
        registry
    }

    /// Add or replace the pattern for a kind
    pub fn register(&mut self, kind: impl Into<String>, pattern: EndpointPattern) {
        self.patterns.insert(kind.into(), pattern);
    }

    /// Build the endpoint of `kind` in `region`
    pub fn build_endpoint(&self, kind: &str, region: &str) -> Result<String, EndpointError> {
        let region = region.trim();
        if region.is_empty() {
            return Err(EndpointError::InvalidRegion);
        }
        self.patterns
            .get(kind)
            .map(|pattern| pattern.render(region))
            .ok_or_else(|| EndpointError::UnsupportedResourceKind(kind.to_string()))
    }
}

static DEFAULT_REGISTRY: LazyLock<EndpointRegistry> =
    LazyLock::new(EndpointRegistry::with_builtin_kinds);

/// Build an endpoint from the built-in registry
pub fn build_endpoint(kind: &str, region: &str) -> Result<String, EndpointError> {
    DEFAULT_REGISTRY.build_endpoint(kind, region)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oss_endpoint() {
        assert_eq!(
            build_endpoint("OSS", "cn-hangzhou").unwrap(),
            "http://oss-cn-hangzhou.aliyuncs.com"
        );
    }

    #[test]
    fn test_sls_endpoint() {
        assert_eq!(
            build_endpoint("LogStore", "cn-beijing").unwrap(),
            "http://cn-beijing.log.aliyuncs.com"
        );
        assert_eq!(
            build_endpoint("Project", "cn-beijing"),
            build_endpoint("MachineGroup", "cn-beijing")
        );
    }

    #[test]
    fn test_empty_region_is_invalid() {
        assert_eq!(build_endpoint("OSS", ""), Err(EndpointError::InvalidRegion));
        assert_eq!(build_endpoint("OSS", "  "), Err(EndpointError::InvalidRegion));
        // region is checked before the kind
        assert_eq!(build_endpoint("RDS", ""), Err(EndpointError::InvalidRegion));
    }

    #[test]
    fn test_unknown_kind_is_unsupported() {
        assert_eq!(
            build_endpoint("RDSInstance", "cn-hangzhou"),
            Err(EndpointError::UnsupportedResourceKind(
                "RDSInstance".to_string()
            ))
        );
    }

    #[test]
    fn test_registered_kind_is_resolvable() {
        let mut registry = EndpointRegistry::default();
        registry.register("RDSInstance", EndpointPattern::new("rds.", ""));
        assert_eq!(
            registry.build_endpoint("RDSInstance", "cn-shanghai").unwrap(),
            "http://rds.cn-shanghai.aliyuncs.com"
        );
        assert!(registry.build_endpoint("OSS", "cn-shanghai").is_err());
    }
}

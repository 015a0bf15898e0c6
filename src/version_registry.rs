use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::OnceLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use crate::negotiation::{self, CompatibilityOutcome, InvalidServerVersion};
use crate::version_tag::VersionTag;

/// Operations exposed by the transformation REST surface
pub const OPERATIONS: [&str; 4] = ["transform", "poll", "retrieve", "delete"];

/// Registry that maps each operation to the API version the server implements for it.
///
/// Versions are validated when registered so that a bad server version fails at
/// startup instead of on the first request.
#[derive(Debug, Clone, Default)]
pub struct VersionRegistry {
    versions: HashMap<String, String>,
}

/// On-disk form of the registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default)]
    pub operations: BTreeMap<String, String>,
}

/// Result of negotiating one request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Negotiation {
    pub operation: String,
    /// Value for the `Content-Version` header. Present whenever the operation has a
    /// registered version, whatever the outcome.
    pub content_version: Option<String>,
    pub outcome: CompatibilityOutcome,
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Operation id cannot be empty")]
    EmptyOperation,

    #[error("Invalid server version '{version}' for operation '{operation}'")]
    InvalidVersion { operation: String, version: String },

    #[error(transparent)]
    ServerVersion(#[from] InvalidServerVersion),

    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    YamlError(#[from] serde_yaml::Error),
}

impl VersionRegistry {
    pub fn new() -> Self {
        Self {
            versions: HashMap::new(),
        }
    }

    /// Registry with every known operation at this package's version
    pub fn with_package_version() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for operation in OPERATIONS {
            registry.register(operation, env!("CARGO_PKG_VERSION"))?;
        }
        Ok(registry)
    }

    pub fn from_config(config: RegistryConfig) -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        for (operation, version) in config.operations {
            registry.register(operation, version)?;
        }
        Ok(registry)
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RegistryError> {
        let config: RegistryConfig = serde_yaml::from_str(yaml)?;
        Self::from_config(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Register the version implemented for an operation, replacing any previous one
    pub fn register(
        &mut self,
        operation: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<(), RegistryError> {
        let operation = operation.into();
        let version = version.into();

        if operation.trim().is_empty() {
            return Err(RegistryError::EmptyOperation);
        }
        validate_server_version(&operation, &version)?;

        self.versions.insert(operation, version);
        Ok(())
    }

    pub fn server_version(&self, operation: &str) -> Option<&str> {
        self.versions.get(operation).map(String::as_str)
    }

    /// All registered operations, sorted
    pub fn operations(&self) -> Vec<&str> {
        let mut operations: Vec<_> = self.versions.keys().map(String::as_str).collect();
        operations.sort();
        operations
    }

    /// Negotiate a request for `operation` sent with the given `Accept-Version` value.
    ///
    /// Operations without a registered version are not negotiated. A missing client
    /// version is checked as the empty string.
    pub fn negotiate(
        &self,
        operation: &str,
        client_version: Option<&str>,
    ) -> Result<Negotiation, RegistryError> {
        let server_version = self.server_version(operation);
        debug!(
            "negotiate(operation: {}, server: {:?}, client: {:?})",
            operation, server_version, client_version
        );

        let outcome = match server_version {
            Some(server) => negotiation::check(server, client_version.unwrap_or_default())?,
            None => CompatibilityOutcome::Compatible,
        };

        Ok(Negotiation {
            operation: operation.to_string(),
            content_version: server_version.map(str::to_string),
            outcome,
        })
    }
}

fn version_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d+(\.\d+)?(\.[^.\s]+)*$").expect("server version pattern is valid")
    })
}

/// Major and minor segments must be numeric; anything after them is free-form
fn validate_server_version(operation: &str, version: &str) -> Result<(), RegistryError> {
    let invalid = || RegistryError::InvalidVersion {
        operation: operation.to_string(),
        version: version.to_string(),
    };

    if !version_pattern().is_match(version) {
        return Err(invalid());
    }

    let tag = VersionTag::new(version);
    if tag.major().is_err() || tag.minor().is_err() {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::NegotiationFailure;
    use std::io::Write;

    #[test]
    fn test_registry_creation() {
        let registry = VersionRegistry::new();
        assert!(registry.operations().is_empty());
        assert!(registry.server_version("poll").is_none());
    }

    #[test]
    fn test_package_version_registry() {
        let registry = VersionRegistry::with_package_version().unwrap();
        assert_eq!(registry.operations(), vec!["delete", "poll", "retrieve", "transform"]);
        assert_eq!(registry.server_version("poll"), Some(env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn test_register_rejects_invalid_versions() {
        let mut registry = VersionRegistry::new();
        assert!(registry.register("poll", "1.0-SNAPSHOT").is_err());
        assert!(registry.register("poll", "v1.0").is_err());
        assert!(registry.register("poll", "").is_err());
        assert!(registry.register("", "1.0").is_err());
        assert!(registry.register("poll", "1.0.0-SNAPSHOT").is_ok());
        assert!(registry.register("poll", "2").is_ok());
    }

    #[test]
    fn test_version_pattern_is_built_once() {
        assert!(std::ptr::eq(version_pattern(), version_pattern()));
        assert!(version_pattern().is_match("10.2.0-rc1"));
        assert!(!version_pattern().is_match("10.2 "));
    }

    #[test]
    fn test_negotiate_reports_content_version_on_failure() {
        let mut registry = VersionRegistry::new();
        registry.register("poll", "1.5.0").unwrap();

        let negotiation = registry.negotiate("poll", Some("1.6")).unwrap();
        assert_eq!(negotiation.content_version.as_deref(), Some("1.5.0"));
        assert_eq!(negotiation.outcome.failure(), Some(NegotiationFailure::MinorTooRecent));

        let negotiation = registry.negotiate("poll", Some("1.4")).unwrap();
        assert_eq!(negotiation.content_version.as_deref(), Some("1.5.0"));
        assert!(negotiation.outcome.is_compatible());
    }

    #[test]
    fn test_negotiate_missing_client_version() {
        let mut registry = VersionRegistry::new();
        registry.register("transform", "1.0").unwrap();

        let negotiation = registry.negotiate("transform", None).unwrap();
        assert_eq!(
            negotiation.outcome.failure(),
            Some(NegotiationFailure::ClientVersionUnparsable)
        );
    }

    #[test]
    fn test_negotiate_unregistered_operation() {
        let registry = VersionRegistry::new();
        let negotiation = registry.negotiate("unknown", Some("garbage")).unwrap();
        assert!(negotiation.content_version.is_none());
        assert!(negotiation.outcome.is_compatible());
    }

    #[test]
    fn test_load_from_yaml() {
        let registry = VersionRegistry::from_yaml_str(
            r#"
            operations:
              poll: "0.2.1"
              retrieve: "0.3"
            "#,
        )
        .unwrap();

        assert_eq!(registry.server_version("poll"), Some("0.2.1"));
        assert_eq!(registry.server_version("retrieve"), Some("0.3"));

        let invalid = VersionRegistry::from_yaml_str(
            r#"
            operations:
              poll: "latest"
            "#,
        );
        assert!(matches!(invalid, Err(RegistryError::InvalidVersion { .. })));
    }

    #[test]
    fn test_load_from_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "operations:\n  delete: \"1.0.0\"").unwrap();

        let registry = VersionRegistry::from_yaml_file(file.path()).unwrap();
        assert_eq!(registry.server_version("delete"), Some("1.0.0"));
    }
}

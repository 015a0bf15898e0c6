use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::debug;
use crate::version_tag::{VersionComponent, VersionTag, VersionTagError};

/// Request header carrying the API version the client was built against
pub const ACCEPT_VERSION: &str = "Accept-Version";

/// Response header carrying the API version implemented by the server
pub const CONTENT_VERSION: &str = "Content-Version";

/// Reasons a client version cannot be served
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NegotiationFailure {
    /// The client version could not be parsed
    ClientVersionUnparsable,
    /// The server has moved past the major version the client asks for
    MajorTooOld,
    /// The client asks for a major version the server does not implement yet
    MajorTooRecent,
    /// The client asks for a minor version the server does not implement yet
    MinorTooRecent,
}

impl NegotiationFailure {
    /// Numeric code surfaced to the client
    pub fn code(self) -> u32 {
        match self {
            NegotiationFailure::ClientVersionUnparsable => 501001,
            NegotiationFailure::MajorTooOld => 501002,
            NegotiationFailure::MajorTooRecent => 501003,
            NegotiationFailure::MinorTooRecent => 501004,
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            NegotiationFailure::ClientVersionUnparsable => "client version could not be parsed",
            NegotiationFailure::MajorTooOld => "requested major version is no longer supported",
            NegotiationFailure::MajorTooRecent => "requested major version is not yet supported",
            NegotiationFailure::MinorTooRecent => "requested minor version is not yet supported",
        }
    }
}

impl fmt::Display for NegotiationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

/// Result of checking a client version against a server version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum CompatibilityOutcome {
    Compatible,
    #[serde(rename_all = "camelCase")]
    Incompatible {
        failure: NegotiationFailure,
        client_version: String,
        server_version: String,
    },
}

impl CompatibilityOutcome {
    pub fn is_compatible(&self) -> bool {
        matches!(self, CompatibilityOutcome::Compatible)
    }

    pub fn failure(&self) -> Option<NegotiationFailure> {
        match self {
            CompatibilityOutcome::Compatible => None,
            CompatibilityOutcome::Incompatible { failure, .. } => Some(*failure),
        }
    }

    fn incompatible(failure: NegotiationFailure, client: &str, server: &str) -> Self {
        CompatibilityOutcome::Incompatible {
            failure,
            client_version: client.to_string(),
            server_version: server.to_string(),
        }
    }
}

/// The server's own version could not be parsed. This is a configuration error on
/// the server side and never a negotiation outcome.
#[derive(Debug, Error)]
#[error("Server version is invalid: {0}")]
pub struct InvalidServerVersion(#[from] pub VersionTagError);

/// Check whether a client built against `client_version` may be served by an
/// operation implemented at `server_version`.
///
/// Major versions must match exactly. The server minor version must be greater than
/// or equal to the client's. Patch and later segments are ignored.
pub fn check(
    server_version: &str,
    client_version: &str,
) -> Result<CompatibilityOutcome, InvalidServerVersion> {
    if server_version == client_version {
        return Ok(CompatibilityOutcome::Compatible);
    }

    let server = VersionTag::new(server_version);
    let client = VersionTag::new(client_version);

    for component in VersionComponent::ALL {
        if server.segment(component) == client.segment(component) {
            continue;
        }

        let server_value = server.component(component)?;
        let client_value = match client.component(component) {
            Ok(value) => value,
            Err(e) => {
                debug!("failed to parse client version {:?}: {}", client_version, e);
                return Ok(CompatibilityOutcome::incompatible(
                    NegotiationFailure::ClientVersionUnparsable,
                    client_version,
                    server_version,
                ));
            }
        };

        let failure = match component {
            VersionComponent::Major if server_value > client_value => {
                Some(NegotiationFailure::MajorTooOld)
            }
            VersionComponent::Major if server_value < client_value => {
                Some(NegotiationFailure::MajorTooRecent)
            }
            VersionComponent::Minor if server_value < client_value => {
                Some(NegotiationFailure::MinorTooRecent)
            }
            _ => None,
        };

        if let Some(failure) = failure {
            return Ok(CompatibilityOutcome::incompatible(
                failure,
                client_version,
                server_version,
            ));
        }
    }

    Ok(CompatibilityOutcome::Compatible)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure_of(server: &str, client: &str) -> Option<NegotiationFailure> {
        check(server, client).unwrap().failure()
    }

    #[test]
    fn test_identical_versions_are_compatible() {
        assert!(check("1.2", "1.2").unwrap().is_compatible());
        assert!(check("1.2.3-SNAPSHOT", "1.2.3-SNAPSHOT").unwrap().is_compatible());
    }

    #[test]
    fn test_patch_segments_are_ignored() {
        assert!(check("1.2", "1.2.9").unwrap().is_compatible());
        assert!(check("1.2.0", "1.2.garbage").unwrap().is_compatible());
        assert!(check("1.2.7", "1.2").unwrap().is_compatible());
    }

    #[test]
    fn test_missing_minor_defaults_to_zero() {
        assert!(check("1.0", "1").unwrap().is_compatible());
        assert!(check("1.3", "1").unwrap().is_compatible());
        assert_eq!(failure_of("1", "1.1"), Some(NegotiationFailure::MinorTooRecent));
    }

    #[test]
    fn test_major_mismatch() {
        assert_eq!(failure_of("2.0", "1.9"), Some(NegotiationFailure::MajorTooOld));
        assert_eq!(failure_of("1.0", "2.0"), Some(NegotiationFailure::MajorTooRecent));
    }

    #[test]
    fn test_minor_mismatch() {
        assert_eq!(failure_of("1.5", "1.6"), Some(NegotiationFailure::MinorTooRecent));
        assert!(check("1.6", "1.5").unwrap().is_compatible());
    }

    #[test]
    fn test_unparsable_client_version() {
        assert_eq!(failure_of("1.0", "abc"), Some(NegotiationFailure::ClientVersionUnparsable));
        assert_eq!(failure_of("1.0", "1.x"), Some(NegotiationFailure::ClientVersionUnparsable));
        assert_eq!(failure_of("1.0", ""), Some(NegotiationFailure::ClientVersionUnparsable));
    }

    #[test]
    fn test_major_failure_stops_before_minor() {
        assert_eq!(failure_of("2.0", "1.abc"), Some(NegotiationFailure::MajorTooOld));
    }

    #[test]
    fn test_equal_non_numeric_segments_are_not_parsed() {
        assert!(check("1.x.0", "1.x").unwrap().is_compatible());
    }

    #[test]
    fn test_incompatible_outcome_carries_versions() {
        let outcome = check("1.5", "1.6").unwrap();
        assert_eq!(
            outcome,
            CompatibilityOutcome::Incompatible {
                failure: NegotiationFailure::MinorTooRecent,
                client_version: "1.6".to_string(),
                server_version: "1.5".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_server_version_is_an_error() {
        assert!(check("one.0", "1.0").is_err());
    }

    #[test]
    fn test_failure_codes() {
        assert_eq!(NegotiationFailure::ClientVersionUnparsable.code(), 501001);
        assert_eq!(NegotiationFailure::MajorTooOld.code(), 501002);
        assert_eq!(NegotiationFailure::MajorTooRecent.code(), 501003);
        assert_eq!(NegotiationFailure::MinorTooRecent.code(), 501004);
    }
}

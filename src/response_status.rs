use reqwest::StatusCode;
use thiserror::Error;
use crate::{
    manager::ManagerError,
    negotiation::{CompatibilityOutcome, InvalidServerVersion, NegotiationFailure},
    poll_response::{AggregationError, ErrorMessage},
    reporter::ReportError,
    retrieval::RetrievalError,
    version_registry::RegistryError,
};

/// Any failure a request can end with, ready to be turned into an HTTP response
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Unsupported version: client {client_version}, server {server_version}: {failure}")]
    UnsupportedVersion {
        failure: NegotiationFailure,
        client_version: String,
        server_version: String,
    },

    #[error(transparent)]
    ServerVersion(#[from] InvalidServerVersion),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Aggregation(#[from] AggregationError),

    #[error(transparent)]
    Retrieval(#[from] RetrievalError),

    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error(transparent)]
    Report(#[from] ReportError),
}

impl ServiceError {
    /// Turn an incompatible outcome into an error, `None` when compatible
    pub fn from_outcome(outcome: &CompatibilityOutcome) -> Option<Self> {
        match outcome {
            CompatibilityOutcome::Compatible => None,
            CompatibilityOutcome::Incompatible {
                failure,
                client_version,
                server_version,
            } => Some(ServiceError::UnsupportedVersion {
                failure: *failure,
                client_version: client_version.clone(),
                server_version: server_version.clone(),
            }),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::UnsupportedVersion { .. } => StatusCode::NOT_IMPLEMENTED,
            ServiceError::ServerVersion(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Registry(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Aggregation(e) if e.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Aggregation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Retrieval(RetrievalError::NotFound { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Retrieval(RetrievalError::NotReady { .. }) => StatusCode::CONFLICT,
            ServiceError::Retrieval(RetrievalError::NoContent { .. }) => StatusCode::NOT_FOUND,
            ServiceError::Manager(ManagerError::NotFound(_)) => StatusCode::NOT_FOUND,
            ServiceError::Manager(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServiceError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Response body. Internal failures are not described to the client.
    pub fn error_message(&self) -> ErrorMessage {
        let status = self.status_code();
        match self {
            ServiceError::UnsupportedVersion { failure, .. } => {
                ErrorMessage::new(self.to_string()).with_detail(failure.code().to_string())
            }
            _ if status.is_server_error() => {
                ErrorMessage::new(status.canonical_reason().unwrap_or("Internal Server Error"))
            }
            _ => ErrorMessage::new(self.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation;
    use crate::poll_response::ConsistencyViolation;

    #[test]
    fn test_negotiation_failure_is_not_implemented() {
        let outcome = negotiation::check("2.0", "1.0").unwrap();
        let error = ServiceError::from_outcome(&outcome).unwrap();

        assert_eq!(error.status_code(), StatusCode::NOT_IMPLEMENTED);
        assert_eq!(error.error_message().details, vec!["501002".to_string()]);
    }

    #[test]
    fn test_compatible_outcome_is_not_an_error() {
        let outcome = negotiation::check("1.2", "1.1").unwrap();
        assert!(ServiceError::from_outcome(&outcome).is_none());
    }

    #[test]
    fn test_unknown_state_is_service_unavailable() {
        let error = ServiceError::from(AggregationError::UnknownTransformationState {
            transform_id: "id123".to_string(),
        });
        assert_eq!(error.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(error.error_message().message, "Service Unavailable");
    }

    #[test]
    fn test_inconsistent_transformation_is_internal_error() {
        let error = ServiceError::from(AggregationError::Inconsistent {
            transform_id: "id123".to_string(),
            violation: ConsistencyViolation::MissingCompletionTime {
                metadata_type: "irm".to_string(),
            },
        });
        assert_eq!(error.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error.error_message().details.is_empty());
    }

    #[test]
    fn test_retrieval_statuses() {
        let not_found = ServiceError::from(RetrievalError::NotFound {
            transform_id: "id123".to_string(),
            metadata_type: "isr".to_string(),
        });
        assert_eq!(not_found.status_code(), StatusCode::NOT_FOUND);

        let no_content = ServiceError::from(RetrievalError::NoContent {
            transform_id: "id123".to_string(),
            metadata_type: "irm".to_string(),
        });
        assert_eq!(no_content.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            no_content.error_message().message,
            "Successful transformation had no metadata."
        );
    }

    #[test]
    fn test_missing_transformation_is_not_found() {
        let error = ServiceError::from(ManagerError::NotFound("id123".to_string()));
        assert_eq!(error.status_code(), StatusCode::NOT_FOUND);
    }
}

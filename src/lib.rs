// Transformation Service: API version negotiation and status polling
pub mod version_tag;
pub mod negotiation;
pub mod version_registry;
pub mod transformation;
pub mod poll_response;
pub mod retrieval;
pub mod manager;
pub mod response_status;
pub mod reporter;

// Re-export core types for convenience
pub use version_tag::{VersionComponent, VersionTag, VersionTagError};
pub use negotiation::{check, CompatibilityOutcome, InvalidServerVersion, NegotiationFailure};
pub use version_registry::{Negotiation, RegistryError, VersionRegistry};
pub use transformation::{FailureReason, MetadataTransformation, Transformation, TransformationState};
pub use poll_response::{aggregate, AggregationError, ErrorMessage, ExternalStatus, MetadataInformation, PollResponse, StatusAggregator};
pub use retrieval::{retrieve_content, ContentDescriptor, RetrievalError};
pub use manager::{ManagerError, SnapshotSource};
pub use response_status::ServiceError;
pub use reporter::{ReportFormat, Reporter};

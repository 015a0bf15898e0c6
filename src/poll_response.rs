use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;
use crate::transformation::{MetadataTransformation, Transformation, TransformationState};

/// Summary used for the top-level error of a failed transformation
pub const TRANSFORMATION_FAILED_MESSAGE: &str = "Transformation failed. Check details for error codes, or, check metadataInformations for specific error messages.";

/// Status exposed to polling clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExternalStatus {
    InProgress,
    Done,
    Failed,
}

/// Map an internal state to the status clients see. `Unknown` has no mapping.
pub fn map_state(state: TransformationState) -> Option<ExternalStatus> {
    match state {
        TransformationState::Failed => Some(ExternalStatus::Failed),
        TransformationState::InProgress => Some(ExternalStatus::InProgress),
        TransformationState::Successful => Some(ExternalStatus::Done),
        TransformationState::Unknown => None,
    }
}

/// Body returned when polling a transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    #[serde(rename = "transformationStatus")]
    pub status: ExternalStatus,
    pub metadata_informations: Vec<MetadataInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<ErrorMessage>,
}

/// Status of a single metadata transformation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataInformation {
    pub metadata_type: String,
    #[serde(rename = "transformationStatus")]
    pub status: ExternalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Url>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transformed_timestamp: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<ErrorMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorMessage {
    pub message: String,
    #[serde(default)]
    pub details: Vec<String>,
}

impl ErrorMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.details.push(detail.into());
        self
    }
}

/// The manager handed over a transformation that breaks its own contract
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsistencyViolation {
    #[error("Completed metadata transformation '{metadata_type}' contained no completion time")]
    MissingCompletionTime { metadata_type: String },

    #[error("Failed metadata transformation '{metadata_type}' contained no failure message")]
    MissingFailureMessage { metadata_type: String },

    #[error("Failed metadata transformation '{metadata_type}' contained no failure reason")]
    MissingFailureReason { metadata_type: String },
}

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("Could not create polling response because transformation {transform_id} was in an unknown state")]
    UnknownTransformationState { transform_id: String },

    #[error("Could not create polling response because metadata transformation '{metadata_type}' of {transform_id} was in an unknown state")]
    UnknownMetadataState {
        transform_id: String,
        metadata_type: String,
    },

    #[error("Transformation {transform_id} is inconsistent: {violation}")]
    Inconsistent {
        transform_id: String,
        #[source]
        violation: ConsistencyViolation,
    },

    #[error("Base location '{0}' cannot be extended with a metadata type")]
    InvalidBaseLocation(String),
}

impl AggregationError {
    /// The manager has not settled on a known state yet; polling again later may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AggregationError::UnknownTransformationState { .. }
                | AggregationError::UnknownMetadataState { .. }
        )
    }
}

/// Build the poll response for `transform`.
///
/// `base_location` is the URI the transformation was polled at; the location of each
/// successful metadata artifact is that URI with the metadata type appended.
pub fn aggregate(
    transform: &Transformation,
    base_location: &Url,
) -> Result<PollResponse, AggregationError> {
    StatusAggregator::new(transform, base_location).aggregate()
}

/// Folds a transformation and its metadata transformations into a single poll response
pub struct StatusAggregator<'a> {
    transform: &'a Transformation,
    base_location: &'a Url,
}

impl<'a> StatusAggregator<'a> {
    pub fn new(transform: &'a Transformation, base_location: &'a Url) -> Self {
        Self {
            transform,
            base_location,
        }
    }

    pub fn aggregate(&self) -> Result<PollResponse, AggregationError> {
        let status = map_state(self.transform.state).ok_or_else(|| {
            AggregationError::UnknownTransformationState {
                transform_id: self.transform.transform_id.clone(),
            }
        })?;

        let metadata_informations = self
            .transform
            .metadatas()
            .map(|metadata| self.metadata_information(metadata))
            .collect::<Result<Vec<_>, _>>()?;

        let error_message = if self.transform.has_failed() {
            Some(self.transformation_error(&metadata_informations))
        } else {
            None
        };

        debug!(
            "aggregated transformation {} as {:?} with {} metadata informations",
            self.transform.transform_id,
            status,
            metadata_informations.len()
        );

        Ok(PollResponse {
            status,
            metadata_informations,
            error_message,
        })
    }

    fn metadata_information(
        &self,
        metadata: &MetadataTransformation,
    ) -> Result<MetadataInformation, AggregationError> {
        let status = map_state(metadata.state).ok_or_else(|| {
            AggregationError::UnknownMetadataState {
                transform_id: self.transform.transform_id.clone(),
                metadata_type: metadata.metadata_type.clone(),
            }
        })?;

        let transformed_timestamp = if metadata.is_completed() {
            let completion_time = metadata.completion_time.ok_or_else(|| {
                self.inconsistent(ConsistencyViolation::MissingCompletionTime {
                    metadata_type: metadata.metadata_type.clone(),
                })
            })?;
            Some(completion_time.fixed_offset())
        } else {
            None
        };

        let location = if metadata.was_successful() {
            Some(self.location_of(&metadata.metadata_type)?)
        } else {
            None
        };

        Ok(MetadataInformation {
            metadata_type: metadata.metadata_type.clone(),
            status,
            location,
            transformed_timestamp,
            error_message: self.metadata_error(metadata)?,
        })
    }

    fn metadata_error(
        &self,
        metadata: &MetadataTransformation,
    ) -> Result<Option<ErrorMessage>, AggregationError> {
        if !metadata.has_failed() {
            return Ok(None);
        }

        let message = metadata.failure_message.as_deref().ok_or_else(|| {
            self.inconsistent(ConsistencyViolation::MissingFailureMessage {
                metadata_type: metadata.metadata_type.clone(),
            })
        })?;
        let reason = metadata.failure_reason.ok_or_else(|| {
            self.inconsistent(ConsistencyViolation::MissingFailureReason {
                metadata_type: metadata.metadata_type.clone(),
            })
        })?;

        Ok(Some(ErrorMessage::new(message).with_detail(reason.name())))
    }

    /// Reasons of every failed metadata transformation, in order, duplicates kept.
    /// Each failed entry has already been checked to carry exactly one reason.
    fn transformation_error(&self, metadata_informations: &[MetadataInformation]) -> ErrorMessage {
        let details = metadata_informations
            .iter()
            .filter(|info| info.status == ExternalStatus::Failed)
            .filter_map(|info| info.error_message.as_ref())
            .flat_map(|error| error.details.iter().cloned())
            .collect();

        ErrorMessage {
            message: TRANSFORMATION_FAILED_MESSAGE.to_string(),
            details,
        }
    }

    fn location_of(&self, metadata_type: &str) -> Result<Url, AggregationError> {
        let mut location = self.base_location.clone();
        location
            .path_segments_mut()
            .map_err(|_| AggregationError::InvalidBaseLocation(self.base_location.to_string()))?
            .pop_if_empty()
            .push(metadata_type);
        Ok(location)
    }

    fn inconsistent(&self, violation: ConsistencyViolation) -> AggregationError {
        warn!(
            "transformation {} violates the manager contract: {}",
            self.transform.transform_id, violation
        );
        AggregationError::Inconsistent {
            transform_id: self.transform.transform_id.clone(),
            violation,
        }
    }
}

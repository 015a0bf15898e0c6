use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a transformation or of one of its metadata transformations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransformationState {
    InProgress,
    Successful,
    Failed,
    Unknown,
}

impl TransformationState {
    /// No further progress is expected
    pub fn is_terminal(self) -> bool {
        matches!(self, TransformationState::Successful | TransformationState::Failed)
    }
}

/// Reason code recorded by the manager when a metadata transformation fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureReason {
    TransformationFailure,
    Unknown,
}

impl FailureReason {
    /// Symbolic name reported to clients
    pub fn name(self) -> &'static str {
        match self {
            FailureReason::TransformationFailure => "TRANSFORMATION_FAILURE",
            FailureReason::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A tracked unit of work converting one resource into one or more metadata artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    pub transform_id: String,
    pub state: TransformationState,
    #[serde(default)]
    pub metadata_transformations: Vec<MetadataTransformation>,
}

/// One artifact-producing sub-task of a transformation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataTransformation {
    pub metadata_type: String,
    pub state: TransformationState,
    /// Set once the state is terminal
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<DateTime<Utc>>,
    /// Set when the state is failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<FailureReason>,
    /// Where the produced artifact can be read from, set when the state is successful
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

impl Transformation {
    pub fn new(transform_id: impl Into<String>, state: TransformationState) -> Self {
        Self {
            transform_id: transform_id.into(),
            state,
            metadata_transformations: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: MetadataTransformation) -> Self {
        self.metadata_transformations.push(metadata);
        self
    }

    pub fn metadatas(&self) -> impl Iterator<Item = &MetadataTransformation> {
        self.metadata_transformations.iter()
    }

    pub fn has_failed(&self) -> bool {
        self.state == TransformationState::Failed
    }

    pub fn has_failed_child(&self) -> bool {
        self.metadatas().any(MetadataTransformation::has_failed)
    }

    /// First metadata transformation of the given type
    pub fn metadata(&self, metadata_type: &str) -> Option<&MetadataTransformation> {
        self.metadatas().find(|m| m.metadata_type == metadata_type)
    }
}

impl MetadataTransformation {
    pub fn new(metadata_type: impl Into<String>, state: TransformationState) -> Self {
        Self {
            metadata_type: metadata_type.into(),
            state,
            completion_time: None,
            failure_message: None,
            failure_reason: None,
            content_location: None,
            content_type: None,
            content_length: None,
        }
    }

    pub fn completed_at(mut self, completion_time: DateTime<Utc>) -> Self {
        self.completion_time = Some(completion_time);
        self
    }

    pub fn with_failure(mut self, message: impl Into<String>, reason: FailureReason) -> Self {
        self.failure_message = Some(message.into());
        self.failure_reason = Some(reason);
        self
    }

    pub fn with_content(mut self, location: impl Into<String>) -> Self {
        self.content_location = Some(location.into());
        self
    }

    pub fn is_completed(&self) -> bool {
        self.state.is_terminal()
    }

    pub fn was_successful(&self) -> bool {
        self.state == TransformationState::Successful
    }

    pub fn has_failed(&self) -> bool {
        self.state == TransformationState::Failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_terminal_states() {
        assert!(TransformationState::Successful.is_terminal());
        assert!(TransformationState::Failed.is_terminal());
        assert!(!TransformationState::InProgress.is_terminal());
        assert!(!TransformationState::Unknown.is_terminal());
    }

    #[test]
    fn test_failed_child_predicate() {
        let transform = Transformation::new("id123", TransformationState::InProgress)
            .with_metadata(MetadataTransformation::new("irm", TransformationState::Successful))
            .with_metadata(MetadataTransformation::new("isr", TransformationState::Failed));

        assert!(transform.has_failed_child());
        assert!(!transform.has_failed());
        assert_eq!(transform.metadata("isr").unwrap().state, TransformationState::Failed);
        assert!(transform.metadata("missing").is_none());
    }

    #[test]
    fn test_deserialize_snapshot() {
        let transform: Transformation = serde_json::from_str(
            r#"{
                "transformId": "id123",
                "state": "FAILED",
                "metadataTransformations": [
                    {
                        "metadataType": "irm",
                        "state": "FAILED",
                        "completionTime": "1970-01-01T00:00:00Z",
                        "failureMessage": "The thing did bad",
                        "failureReason": "TRANSFORMATION_FAILURE"
                    }
                ]
            }"#,
        )
        .unwrap();

        let metadata = &transform.metadata_transformations[0];
        assert_eq!(transform.state, TransformationState::Failed);
        assert_eq!(metadata.failure_reason, Some(FailureReason::TransformationFailure));
        assert_eq!(metadata.completion_time, Utc.timestamp_millis_opt(0).single());
    }

    #[test]
    fn test_failure_reason_names() {
        assert_eq!(FailureReason::TransformationFailure.name(), "TRANSFORMATION_FAILURE");
        assert_eq!(FailureReason::Unknown.to_string(), "UNKNOWN");
    }
}

use serde::Serialize;
use thiserror::Error;
use crate::transformation::{Transformation, TransformationState};

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// What the retrieve endpoint needs to stream a produced metadata artifact
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDescriptor {
    pub transform_id: String,
    pub metadata_type: String,
    pub location: String,
    pub content_type: String,
    /// Unknown when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_length: Option<u64>,
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Transformation {transform_id} has no metadata of type '{metadata_type}'")]
    NotFound {
        transform_id: String,
        metadata_type: String,
    },

    #[error("Metadata '{metadata_type}' of transformation {transform_id} is not available while {state:?}")]
    NotReady {
        transform_id: String,
        metadata_type: String,
        state: TransformationState,
    },

    #[error("Successful transformation had no metadata.")]
    NoContent {
        transform_id: String,
        metadata_type: String,
    },
}

/// Locate the produced content for one metadata type of a transformation
pub fn retrieve_content(
    transform: &Transformation,
    metadata_type: &str,
) -> Result<ContentDescriptor, RetrievalError> {
    let metadata = transform
        .metadata(metadata_type)
        .ok_or_else(|| RetrievalError::NotFound {
            transform_id: transform.transform_id.clone(),
            metadata_type: metadata_type.to_string(),
        })?;

    if !metadata.was_successful() {
        return Err(RetrievalError::NotReady {
            transform_id: transform.transform_id.clone(),
            metadata_type: metadata_type.to_string(),
            state: metadata.state,
        });
    }

    let location = metadata
        .content_location
        .clone()
        .ok_or_else(|| RetrievalError::NoContent {
            transform_id: transform.transform_id.clone(),
            metadata_type: metadata_type.to_string(),
        })?;

    Ok(ContentDescriptor {
        transform_id: transform.transform_id.clone(),
        metadata_type: metadata.metadata_type.clone(),
        location,
        content_type: metadata
            .content_type
            .clone()
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string()),
        content_length: metadata.content_length,
    })
}

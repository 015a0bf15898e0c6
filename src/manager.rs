use std::path::Path;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use crate::transformation::Transformation;

/// Where a transformation snapshot is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotSource {
    File(String),
    Http(Url),
}

impl SnapshotSource {
    /// `http://` and `https://` values are fetched, anything else is a file path
    pub fn parse(value: &str) -> Self {
        match Url::parse(value) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => SnapshotSource::Http(url),
            _ => SnapshotSource::File(value.to_string()),
        }
    }

    pub async fn load(&self) -> Result<Transformation, ManagerError> {
        match self {
            SnapshotSource::File(path) => load_snapshot(path),
            SnapshotSource::Http(url) => fetch_snapshot(url).await,
        }
    }
}

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error("Transformation not found at {0}")]
    NotFound(String),

    #[error("Manager responded with {status} for {url}")]
    UnexpectedStatus { status: StatusCode, url: String },

    #[error("Failed to read snapshot: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to fetch snapshot: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read a transformation snapshot from a JSON file
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Transformation, ManagerError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => ManagerError::NotFound(path.display().to_string()),
        _ => ManagerError::Io(e),
    })?;

    let transform: Transformation = serde_json::from_str(&content)?;
    debug!("loaded transformation {} from {}", transform.transform_id, path.display());
    Ok(transform)
}

/// Fetch a transformation snapshot from the manager over HTTP
pub async fn fetch_snapshot(url: &Url) -> Result<Transformation, ManagerError> {
    info!("Fetching transformation from {}", url);
    let response = reqwest::get(url.clone()).await?;

    match response.status() {
        StatusCode::OK => {
            let body = response.text().await?;
            Ok(serde_json::from_str(&body)?)
        }
        StatusCode::NOT_FOUND => Err(ManagerError::NotFound(url.to_string())),
        status => Err(ManagerError::UnexpectedStatus {
            status,
            url: url.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transformation::TransformationState;
    use std::io::Write;

    #[test]
    fn test_snapshot_source_parse() {
        assert!(matches!(
            SnapshotSource::parse("https://manager.local/transform/id123"),
            SnapshotSource::Http(_)
        ));
        assert_eq!(
            SnapshotSource::parse("snapshots/id123.json"),
            SnapshotSource::File("snapshots/id123.json".to_string())
        );
        assert!(matches!(
            SnapshotSource::parse("file:///tmp/id123.json"),
            SnapshotSource::File(_)
        ));
    }

    #[test]
    fn test_load_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"transformId": "id123", "state": "IN_PROGRESS", "metadataTransformations": []}}"#
        )
        .unwrap();

        let transform = load_snapshot(file.path()).unwrap();
        assert_eq!(transform.transform_id, "id123");
        assert_eq!(transform.state, TransformationState::InProgress);
    }

    #[test]
    fn test_missing_snapshot_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshot(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ManagerError::NotFound(_)));
    }

    #[test]
    fn test_malformed_snapshot() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"transformId": "id123", "state": "SLEEPING"}}"#).unwrap();

        assert!(matches!(load_snapshot(file.path()), Err(ManagerError::Json(_))));
    }
}

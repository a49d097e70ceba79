use std::path::Path;

use anyhow::{Context, Result};
use shared::{domain::TurnId, error::ApiError};

/// A file picked by the user and waiting to be uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub filename: String,
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        let filename = filename.into();
        let mime_type = mime_guess::from_path(&filename)
            .first()
            .map(|mime| mime.essence_str().to_string());
        Self {
            filename,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|name| name.to_str())
            .with_context(|| format!("'{}' has no usable file name", path.display()))?
            .to_string();
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("failed to read '{}'", path.display()))?;
        Ok(Self::new(filename, bytes))
    }
}

/// How a conversation submission settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Empty question; nothing was sent.
    Rejected,
    Answered { turn_id: TurnId },
    Failed(ApiError),
}

/// How a document operation settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationOutcome {
    Rejected,
    Completed,
    Failed(ApiError),
}

impl OperationOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, OperationOutcome::Completed)
    }
}

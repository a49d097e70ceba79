use std::time::Duration;

use reqwest::StatusCode;
use shared::error::{ApiError, ErrorCode};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("{0}")]
    Validation(String),
    #[error("invalid server url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("server returned {status}")]
    Status {
        status: StatusCode,
        message: Option<String>,
    },
    #[error("unexpected response body: {0}")]
    Payload(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("request cancelled")]
    Cancelled,
}

impl ClientError {
    pub fn code(&self) -> ErrorCode {
        match self {
            ClientError::Validation(_) | ClientError::InvalidUrl(_) => ErrorCode::Validation,
            ClientError::Transport(_) => ErrorCode::Transport,
            ClientError::Status { .. } => ErrorCode::Status,
            ClientError::Payload(_) => ErrorCode::Payload,
            ClientError::Timeout(_) => ErrorCode::Timeout,
            ClientError::Cancelled => ErrorCode::Cancelled,
        }
    }

    /// Human readable detail worth showing next to the operation context.
    /// Transport and payload failures have none; the caller falls back to the
    /// bare context.
    pub fn detail(&self) -> Option<String> {
        match self {
            ClientError::Status { message, .. } => message.clone(),
            ClientError::Validation(message) => Some(message.clone()),
            ClientError::Timeout(_) | ClientError::Cancelled | ClientError::InvalidUrl(_) => {
                Some(self.to_string())
            }
            ClientError::Transport(_) | ClientError::Payload(_) => None,
        }
    }

    pub fn notice(&self, context: &str) -> String {
        match self.detail() {
            Some(detail) => format!("{context}: {detail}"),
            None => context.to_string(),
        }
    }

    pub fn report(&self, context: &str) -> ApiError {
        ApiError::new(self.code(), self.notice(context))
    }
}

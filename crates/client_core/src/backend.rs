use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, Response,
};
use serde::de::DeserializeOwned;
use shared::{
    domain::DocumentName,
    protocol::{routes, AnswerResponse, QuestionRequest, ServerMessage, UPLOAD_FIELD},
};
use tracing::{debug, warn};
use url::Url;

use crate::{error::ClientError, types::SelectedFile};

/// The inference and ingestion service, as seen by the controllers.
#[async_trait]
pub trait RagBackend: Send + Sync {
    async fn ingest(&self) -> Result<(), ClientError>;
    async fn list_documents(&self) -> Result<Vec<DocumentName>, ClientError>;
    async fn delete_document(&self, name: &DocumentName) -> Result<String, ClientError>;
    async fn upload_document(&self, file: SelectedFile) -> Result<String, ClientError>;
    async fn get_answer(&self, question: &str) -> Result<AnswerResponse, ClientError>;
}

/// How a failure body is turned into a user-facing message.
#[derive(Debug, Clone, Copy)]
enum FailureBody {
    Text,
    /// `{ "response": ... }`, falling back to the raw text when the server
    /// answered with something else.
    Envelope,
}

pub struct HttpBackend {
    http: Client,
    base_url: Url,
}

impl HttpBackend {
    pub fn new(server_url: &str) -> Result<Self, ClientError> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self, ClientError> {
        let base_url = Url::parse(server_url.trim())?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::Validation(format!(
                "server url '{server_url}' cannot carry a path"
            )));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, ClientError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::Validation("server url cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn checked_body(response: Response, failure: FailureBody) -> Result<String, ClientError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }

        let message = match failure {
            FailureBody::Text => body,
            FailureBody::Envelope => ServerMessage::parse(&body).unwrap_or(body),
        };
        let message = Some(message.trim().to_string()).filter(|message| !message.is_empty());
        warn!(status = status.as_u16(), ?message, "backend: request rejected");
        Err(ClientError::Status { status, message })
    }

    fn decode<T: DeserializeOwned>(body: &str) -> Result<T, ClientError> {
        serde_json::from_str(body).map_err(|e| ClientError::Payload(e.to_string()))
    }
}

#[async_trait]
impl RagBackend for HttpBackend {
    async fn ingest(&self) -> Result<(), ClientError> {
        let response = self
            .http
            .get(self.endpoint(&[routes::INGEST])?)
            .send()
            .await?;
        let body = Self::checked_body(response, FailureBody::Text).await?;
        let _: serde_json::Value = Self::decode(&body)?;
        Ok(())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentName>, ClientError> {
        let response = self
            .http
            .get(self.endpoint(&[routes::VIEW_DOCS])?)
            .send()
            .await?;
        let body = Self::checked_body(response, FailureBody::Text).await?;
        let documents: Vec<DocumentName> = Self::decode(&body)?;
        debug!(count = documents.len(), "backend: documents listed");
        Ok(documents)
    }

    async fn delete_document(&self, name: &DocumentName) -> Result<String, ClientError> {
        let url = self.endpoint(&[routes::DELETE_DOC, name.as_str()])?;
        debug!(%url, "backend: deleting document");
        let response = self.http.delete(url).send().await?;
        let body = Self::checked_body(response, FailureBody::Envelope).await?;
        let message: ServerMessage = Self::decode(&body)?;
        Ok(message.response)
    }

    async fn upload_document(&self, file: SelectedFile) -> Result<String, ClientError> {
        let size_bytes = file.bytes.len();
        let mut part = Part::bytes(file.bytes).file_name(file.filename.clone());
        if let Some(mime_type) = &file.mime_type {
            part = part.mime_str(mime_type)?;
        }
        let form = Form::new().part(UPLOAD_FIELD, part);
        debug!(filename = %file.filename, size_bytes, "backend: uploading document");

        let response = self
            .http
            .post(self.endpoint(&[routes::UPLOAD_DOC])?)
            .multipart(form)
            .send()
            .await?;
        let body = Self::checked_body(response, FailureBody::Envelope).await?;
        let message: ServerMessage = Self::decode(&body)?;
        Ok(message.response)
    }

    async fn get_answer(&self, question: &str) -> Result<AnswerResponse, ClientError> {
        let response = self
            .http
            .post(self.endpoint(&[routes::GET_ANSWER])?)
            .json(&QuestionRequest(question.to_string()))
            .send()
            .await?;
        let body = Self::checked_body(response, FailureBody::Text).await?;
        Self::decode(&body)
    }
}

#[cfg(test)]
#[path = "tests/backend_tests.rs"]
mod tests;

use serde::{Deserialize, Serialize};

use crate::domain::DocumentName;

/// Path segments of the backend endpoints, relative to the server url.
pub mod routes {
    pub const INGEST: &str = "ingest";
    pub const VIEW_DOCS: &str = "view_docs";
    pub const DELETE_DOC: &str = "delete_doc";
    pub const UPLOAD_DOC: &str = "upload_doc";
    pub const GET_ANSWER: &str = "get_answer";
}

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "document";

/// Body of `POST /get_answer`: the bare question encoded as a JSON string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionRequest(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExcerpt {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    pub answer: String,
    #[serde(default)]
    pub source: Vec<SourceExcerpt>,
}

/// `{ "response": ... }` envelope used by the upload and delete endpoints for
/// both success and failure bodies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerMessage {
    pub response: String,
}

impl ServerMessage {
    /// Extracts the `response` field from a failure body, if the body is that
    /// envelope at all.
    pub fn parse(body: &str) -> Option<String> {
        serde_json::from_str::<ServerMessage>(body)
            .ok()
            .map(|message| message.response)
    }
}

pub type DocumentListing = Vec<DocumentName>;

//! Backend doubles shared by the controller tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    extract::{Multipart, Path, State},
    http::{header::CONTENT_TYPE, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::json;
use shared::{
    domain::DocumentName,
    protocol::{AnswerResponse, SourceExcerpt},
};
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex, Semaphore},
};

use crate::{
    backend::RagBackend,
    error::ClientError,
    notify::{NotifyLevel, Notifier},
    types::SelectedFile,
};

#[derive(Default)]
pub struct RecordingNotifier {
    entries: std::sync::Mutex<Vec<(NotifyLevel, String)>>,
}

impl RecordingNotifier {
    pub fn entries(&self) -> Vec<(NotifyLevel, String)> {
        self.entries.lock().expect("notifier lock").clone()
    }

    pub fn messages(&self, level: NotifyLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(entry_level, _)| *entry_level == level)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.messages(NotifyLevel::Error)
    }

    pub fn successes(&self) -> Vec<String> {
        self.messages(NotifyLevel::Success)
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, level: NotifyLevel, message: &str) {
        self.entries
            .lock()
            .expect("notifier lock")
            .push((level, message.to_string()));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPart {
    pub field: String,
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Canned failure: status plus raw body.
pub type Failure = (StatusCode, String);

#[derive(Clone, Default)]
pub struct MockServerState {
    pub documents: Arc<Mutex<Vec<String>>>,
    pub answer: Arc<Mutex<Option<AnswerResponse>>>,
    pub questions: Arc<Mutex<Vec<(Option<String>, String)>>>,
    pub deleted: Arc<Mutex<Vec<String>>>,
    pub uploads: Arc<Mutex<Vec<UploadedPart>>>,
    pub failures: Arc<Mutex<HashMap<&'static str, Failure>>>,
    pub gates: Arc<Mutex<HashMap<&'static str, Arc<Semaphore>>>>,
    pub ingest_hits: Arc<AtomicUsize>,
    pub view_docs_hits: Arc<AtomicUsize>,
    pub answer_hits: Arc<AtomicUsize>,
}

impl MockServerState {
    pub async fn with_documents(self, documents: &[&str]) -> Self {
        *self.documents.lock().await = documents.iter().map(|d| d.to_string()).collect();
        self
    }

    pub async fn answer_with(&self, answer: &str, sources: &[(&str, &str)]) {
        *self.answer.lock().await = Some(AnswerResponse {
            query: None,
            answer: answer.to_string(),
            source: sources
                .iter()
                .map(|(name, content)| SourceExcerpt {
                    name: name.to_string(),
                    content: content.to_string(),
                })
                .collect(),
        });
    }

    pub async fn fail(&self, route: &'static str, status: StatusCode, body: impl Into<String>) {
        self.failures.lock().await.insert(route, (status, body.into()));
    }

    /// Holds each request to `route` until a permit is added to the
    /// returned gate.
    pub async fn gate(&self, route: &'static str) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        self.gates.lock().await.insert(route, gate.clone());
        gate
    }

    async fn wait_gate(&self, route: &'static str) {
        let gate = self.gates.lock().await.get(route).cloned();
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }
    }

    async fn failure(&self, route: &'static str) -> Option<Response> {
        self.failures
            .lock()
            .await
            .get(route)
            .cloned()
            .map(|(status, body)| (status, body).into_response())
    }

    pub fn view_docs_hits(&self) -> usize {
        self.view_docs_hits.load(Ordering::SeqCst)
    }
}

async fn ingest(State(state): State<MockServerState>) -> Response {
    state.ingest_hits.fetch_add(1, Ordering::SeqCst);
    state.wait_gate("ingest").await;
    if let Some(failure) = state.failure("ingest").await {
        return failure;
    }
    Json(json!({ "response": "Success" })).into_response()
}

async fn view_docs(State(state): State<MockServerState>) -> Response {
    state.view_docs_hits.fetch_add(1, Ordering::SeqCst);
    state.wait_gate("view_docs").await;
    if let Some(failure) = state.failure("view_docs").await {
        return failure;
    }
    Json(state.documents.lock().await.clone()).into_response()
}

async fn delete_doc(
    State(state): State<MockServerState>,
    Path(filename): Path<String>,
) -> Response {
    state.wait_gate("delete_doc").await;
    if let Some(failure) = state.failure("delete_doc").await {
        return failure;
    }
    let mut documents = state.documents.lock().await;
    let Some(position) = documents.iter().position(|doc| *doc == filename) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "response": "Non-existant file" })),
        )
            .into_response();
    };
    documents.remove(position);
    state.deleted.lock().await.push(filename);
    Json(json!({ "response": "Document deletion successful" })).into_response()
}

async fn upload_doc(State(state): State<MockServerState>, mut multipart: Multipart) -> Response {
    while let Ok(Some(field)) = multipart.next_field().await {
        let part = UploadedPart {
            field: field.name().unwrap_or_default().to_string(),
            filename: field.file_name().map(str::to_string),
            content_type: field.content_type().map(str::to_string),
            bytes: field.bytes().await.map(|b| b.to_vec()).unwrap_or_default(),
        };
        state.uploads.lock().await.push(part);
    }
    state.wait_gate("upload_doc").await;
    if let Some(failure) = state.failure("upload_doc").await {
        return failure;
    }
    let filename = state
        .uploads
        .lock()
        .await
        .last()
        .and_then(|part| part.filename.clone());
    let Some(filename) = filename else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "response": "No document file found" })),
        )
            .into_response();
    };
    state.documents.lock().await.push(filename);
    Json(json!({ "response": "Document upload successful" })).into_response()
}

async fn get_answer(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    state.answer_hits.fetch_add(1, Ordering::SeqCst);
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    state.questions.lock().await.push((content_type, body));
    state.wait_gate("get_answer").await;
    if let Some(failure) = state.failure("get_answer").await {
        return failure;
    }
    match state.answer.lock().await.clone() {
        Some(answer) => Json(answer).into_response(),
        None => (StatusCode::BAD_REQUEST, "Empty Query").into_response(),
    }
}

pub async fn spawn_mock_server(state: MockServerState) -> Result<String> {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let app = Router::new()
        .route("/ingest", get(ingest))
        .route("/view_docs", get(view_docs))
        .route("/delete_doc/:filename", delete(delete_doc))
        .route("/upload_doc", post(upload_doc))
        .route("/get_answer", post(get_answer))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(format!("http://{addr}"))
}

/// Polls until `condition` holds; requests in flight on the same task make
/// progress between polls.
pub async fn eventually(mut condition: impl FnMut() -> bool) {
    for _ in 0..200 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Backend whose list replies are released by the test, in any order.
#[derive(Default)]
pub struct ScriptedListBackend {
    replies: Mutex<VecDeque<oneshot::Receiver<Vec<DocumentName>>>>,
    calls: AtomicUsize,
}

impl ScriptedListBackend {
    pub async fn push_reply(&self) -> oneshot::Sender<Vec<DocumentName>> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().await.push_back(rx);
        tx
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn unsupported() -> ClientError {
        ClientError::Validation("not scripted".to_string())
    }
}

#[async_trait]
impl RagBackend for ScriptedListBackend {
    async fn ingest(&self) -> Result<(), ClientError> {
        Err(Self::unsupported())
    }

    async fn list_documents(&self) -> Result<Vec<DocumentName>, ClientError> {
        let reply = self.replies.lock().await.pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        match reply {
            Some(reply) => reply.await.map_err(|_| ClientError::Cancelled),
            None => Err(Self::unsupported()),
        }
    }

    async fn delete_document(&self, _name: &DocumentName) -> Result<String, ClientError> {
        Err(Self::unsupported())
    }

    async fn upload_document(&self, _file: SelectedFile) -> Result<String, ClientError> {
        Err(Self::unsupported())
    }

    async fn get_answer(&self, _question: &str) -> Result<AnswerResponse, ClientError> {
        Err(Self::unsupported())
    }
}

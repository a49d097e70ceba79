//! Corpus management: upload, ingestion, listing and deletion.
//!
//! The document list is a cache of the backend listing. It is only ever
//! replaced wholesale by a successful list call, and every mutating operation
//! is followed by one.

use std::{sync::Arc, time::Duration};

use shared::domain::DocumentName;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
    backend::RagBackend,
    cancel::{bounded, Cancellation},
    notify::{NotifyLevel, Notifier},
    status::{BusyFlags, BusyTracker, Operation},
    types::{OperationOutcome, SelectedFile},
};

const NO_FILE_NOTICE: &str = "Please select a document to upload.";
const NO_DOCUMENT_NOTICE: &str = "Please select a document to delete.";

#[derive(Default)]
struct DocumentState {
    documents: Vec<DocumentName>,
    selection: Option<SelectedFile>,
}

pub struct DocumentManager {
    backend: Arc<dyn RagBackend>,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
    busy: BusyTracker,
    cancellation: Cancellation,
    inner: Mutex<DocumentState>,
}

impl DocumentManager {
    pub fn new(
        backend: Arc<dyn RagBackend>,
        notifier: Arc<dyn Notifier>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            notifier,
            request_timeout,
            busy: BusyTracker::default(),
            cancellation: Cancellation::default(),
            inner: Mutex::new(DocumentState::default()),
        }
    }

    pub async fn list_documents(&self) -> OperationOutcome {
        self.refresh(true).await
    }

    /// `announce` is false for the resync that follows a mutation, so the
    /// mutation's own notice stays the only success notice.
    async fn refresh(&self, announce: bool) -> OperationOutcome {
        let _busy = self.busy.begin(Operation::List);
        let token = self.cancellation.token();
        match bounded(self.backend.list_documents(), self.request_timeout, token).await {
            Ok(documents) => {
                info!(count = documents.len(), "documents: list refreshed");
                self.inner.lock().await.documents = documents;
                if announce {
                    self.notifier
                        .notify(NotifyLevel::Success, "List loaded successfully");
                }
                OperationOutcome::Completed
            }
            Err(err) => {
                warn!(error = %err, "documents: list failed, keeping cached list");
                let report = err.report("Error loading documents");
                self.notifier.notify(NotifyLevel::Error, &report.message);
                OperationOutcome::Failed(report)
            }
        }
    }

    /// Replaces the pending selection. A dismissed picker (`None`) keeps the
    /// previous one.
    pub async fn select_file(&self, file: Option<SelectedFile>) {
        if let Some(file) = file {
            info!(filename = %file.filename, "documents: file selected");
            self.inner.lock().await.selection = Some(file);
        }
    }

    /// Uploads the pending selection. The selection is consumed whatever the
    /// result; only a successful upload triggers a re-list.
    pub async fn upload_document(&self) -> OperationOutcome {
        let Some(file) = self.inner.lock().await.selection.take() else {
            self.notifier.notify(NotifyLevel::Error, NO_FILE_NOTICE);
            return OperationOutcome::Rejected;
        };

        let _busy = self.busy.begin(Operation::Upload);
        let token = self.cancellation.token();
        let filename = file.filename.clone();
        match bounded(
            self.backend.upload_document(file),
            self.request_timeout,
            token,
        )
        .await
        {
            Ok(response) => {
                info!(%filename, %response, "documents: upload accepted");
                self.notifier
                    .notify(NotifyLevel::Success, "Document upload successful");
                self.refresh(false).await;
                OperationOutcome::Completed
            }
            Err(err) => {
                warn!(%filename, error = %err, "documents: upload failed");
                let report = err.report("Error uploading document");
                self.notifier.notify(NotifyLevel::Error, &report.message);
                OperationOutcome::Failed(report)
            }
        }
    }

    /// Indexes every stored document. The listing shows filenames only, so
    /// there is nothing to re-list afterwards.
    pub async fn ingest_corpus(&self) -> OperationOutcome {
        let _busy = self.busy.begin(Operation::Ingest);
        let token = self.cancellation.token();
        match bounded(self.backend.ingest(), self.request_timeout, token).await {
            Ok(()) => {
                info!("documents: ingestion finished");
                self.notifier
                    .notify(NotifyLevel::Success, "Ingested successfully");
                OperationOutcome::Completed
            }
            Err(err) => {
                warn!(error = %err, "documents: ingestion failed");
                let report = err.report("Error ingesting data");
                self.notifier.notify(NotifyLevel::Error, &report.message);
                OperationOutcome::Failed(report)
            }
        }
    }

    /// Deletes one document, then re-lists whether or not the delete
    /// succeeded: after a failed delete the server state is unknown.
    pub async fn delete_document(&self, name: &DocumentName) -> OperationOutcome {
        if name.as_str().trim().is_empty() {
            self.notifier.notify(NotifyLevel::Error, NO_DOCUMENT_NOTICE);
            return OperationOutcome::Rejected;
        }

        let outcome = {
            let _busy = self.busy.begin(Operation::Delete);
            let token = self.cancellation.token();
            match bounded(
                self.backend.delete_document(name),
                self.request_timeout,
                token,
            )
            .await
            {
                Ok(response) => {
                    info!(document = %name, %response, "documents: deleted");
                    self.notifier
                        .notify(NotifyLevel::Success, "Deleted successfully");
                    OperationOutcome::Completed
                }
                Err(err) => {
                    warn!(document = %name, error = %err, "documents: delete failed");
                    let report = err.report("Error deleting the document");
                    self.notifier.notify(NotifyLevel::Error, &report.message);
                    OperationOutcome::Failed(report)
                }
            }
        };

        self.refresh(false).await;
        outcome
    }

    pub async fn documents(&self) -> Vec<DocumentName> {
        self.inner.lock().await.documents.clone()
    }

    pub async fn pending_selection(&self) -> Option<SelectedFile> {
        self.inner.lock().await.selection.clone()
    }

    pub fn status(&self) -> BusyFlags {
        self.busy.snapshot()
    }

    pub fn any_busy(&self) -> bool {
        self.status().any()
    }

    pub fn cancel_outstanding(&self) {
        self.cancellation.cancel_outstanding();
    }
}

#[cfg(test)]
#[path = "tests/documents_tests.rs"]
mod tests;

use std::{sync::Arc, time::Duration};

use tracing::info;

use crate::{
    backend::{HttpBackend, RagBackend},
    conversation::ConversationController,
    documents::DocumentManager,
    error::ClientError,
    notify::Notifier,
    status::BusyFlags,
};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:5000";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub server_url: String,
    pub request_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }
}

/// Client state for one user session: the transcript and the document
/// panel. Created when the session starts; [`Self::shutdown`] abandons
/// whatever is still in flight.
pub struct AssistantSession {
    conversation: ConversationController,
    documents: DocumentManager,
}

impl AssistantSession {
    pub fn connect(
        config: &SessionConfig,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, ClientError> {
        let backend = HttpBackend::new(&config.server_url)?;
        info!(server_url = %backend.base_url(), "session: connected");
        Ok(Self::new(Arc::new(backend), notifier, config.request_timeout))
    }

    pub fn new(
        backend: Arc<dyn RagBackend>,
        notifier: Arc<dyn Notifier>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            conversation: ConversationController::new(
                backend.clone(),
                notifier.clone(),
                request_timeout,
            ),
            documents: DocumentManager::new(backend, notifier, request_timeout),
        }
    }

    pub fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    pub fn documents(&self) -> &DocumentManager {
        &self.documents
    }

    pub fn status(&self) -> BusyFlags {
        let mut flags = self.documents.status();
        flags.ask = self.conversation.is_pending();
        flags
    }

    pub fn any_busy(&self) -> bool {
        self.status().any()
    }

    pub fn shutdown(&self) {
        self.conversation.cancel_outstanding();
        self.documents.cancel_outstanding();
        info!("session: outstanding requests cancelled");
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;

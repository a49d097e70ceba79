//! Client-side controllers for a retrieval-augmented question answering
//! service: the conversation transcript and the document corpus panel.

pub mod backend;
pub mod cancel;
pub mod conversation;
pub mod documents;
pub mod error;
pub mod notify;
pub mod session;
pub mod status;
pub mod types;

pub use backend::{HttpBackend, RagBackend};
pub use conversation::ConversationController;
pub use documents::DocumentManager;
pub use error::ClientError;
pub use notify::{Notifier, NotifyLevel, TracingNotifier};
pub use session::{AssistantSession, SessionConfig, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SERVER_URL};
pub use status::{BusyFlags, Operation};
pub use types::{OperationOutcome, SelectedFile, SubmitOutcome};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

//! Question/answer transcript.

use std::{
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use shared::{
    domain::{Turn, TurnId, TurnText},
    protocol::AnswerResponse,
};
use tracing::{info, warn};

use crate::{
    backend::RagBackend,
    cancel::{bounded, Cancellation},
    notify::{NotifyLevel, Notifier},
    status::{BusyTracker, Operation},
    types::SubmitOutcome,
};

const EMPTY_QUESTION_NOTICE: &str = "Please enter valid input and try again.";
const ANSWER_FAILURE_CONTEXT: &str = "Error getting answer";

#[derive(Default)]
struct ConversationState {
    transcript: Vec<Turn>,
    input: String,
    next_turn_id: u64,
}

impl ConversationState {
    fn allocate_id(&mut self) -> TurnId {
        let id = TurnId(self.next_turn_id);
        self.next_turn_id += 1;
        id
    }

    fn resolve(&mut self, pending_id: TurnId, answer: AnswerResponse) {
        if let Some(turn) = self
            .transcript
            .iter_mut()
            .find(|turn| turn.id == pending_id && turn.text.is_pending())
        {
            turn.text = TurnText::Final(answer.answer);
            turn.sources = answer.source;
        }
    }

    fn discard(&mut self, pending_id: TurnId) {
        self.transcript
            .retain(|turn| !(turn.id == pending_id && turn.text.is_pending()));
    }
}

/// Placeholder bot turn owned by one submission. Dropped unresolved (failure,
/// or the submitting future itself dropped) it leaves the transcript.
struct PendingTurn<'a> {
    state: &'a Mutex<ConversationState>,
    id: TurnId,
    resolved: bool,
}

impl PendingTurn<'_> {
    fn resolve(mut self, answer: AnswerResponse) {
        lock_state(self.state).resolve(self.id, answer);
        self.resolved = true;
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            lock_state(self.state).discard(self.id);
        }
    }
}

fn lock_state(state: &Mutex<ConversationState>) -> MutexGuard<'_, ConversationState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct ConversationController {
    backend: Arc<dyn RagBackend>,
    notifier: Arc<dyn Notifier>,
    request_timeout: Duration,
    busy: BusyTracker,
    cancellation: Cancellation,
    inner: Mutex<ConversationState>,
}

impl ConversationController {
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
            inner: Mutex::new(ConversationState::default()),
        }
    }

    /// Appends the user turn plus a pending bot turn, then waits for the
    /// answer. A failed answer removes the pending turn but keeps the
    /// question.
    ///
    /// Overlapping submissions are not blocked here; callers that want one
    /// question at a time gate on [`Self::is_pending`].
    pub async fn submit_question(&self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            self.notifier.notify(NotifyLevel::Error, EMPTY_QUESTION_NOTICE);
            return SubmitOutcome::Rejected;
        }

        let _busy = self.busy.begin(Operation::Ask);
        let token = self.cancellation.token();
        let pending = {
            let mut state = self.state();
            let user_id = state.allocate_id();
            state.transcript.push(Turn::user(user_id, text));
            let pending_id = state.allocate_id();
            state.transcript.push(Turn::pending_bot(pending_id));
            state.input.clear();
            PendingTurn {
                state: &self.inner,
                id: pending_id,
                resolved: false,
            }
        };
        let turn_id = pending.id;
        info!(turn_id = turn_id.0, "conversation: question submitted");

        let result = bounded(self.backend.get_answer(text), self.request_timeout, token).await;

        match result {
            Ok(answer) => {
                info!(
                    turn_id = turn_id.0,
                    sources = answer.source.len(),
                    "conversation: answer received"
                );
                pending.resolve(answer);
                SubmitOutcome::Answered { turn_id }
            }
            Err(err) => {
                warn!(turn_id = turn_id.0, error = %err, "conversation: answer failed");
                drop(pending);
                let report = err.report(ANSWER_FAILURE_CONTEXT);
                self.notifier.notify(NotifyLevel::Error, &report.message);
                SubmitOutcome::Failed(report)
            }
        }
    }

    /// Submits whatever is in the input buffer.
    pub async fn submit_input(&self) -> SubmitOutcome {
        let text = self.state().input.clone();
        self.submit_question(&text).await
    }

    pub async fn set_input(&self, text: impl Into<String>) {
        self.state().input = text.into();
    }

    pub async fn input(&self) -> String {
        self.state().input.clone()
    }

    /// Rows the input box needs to show its whole draft.
    pub async fn input_rows(&self) -> usize {
        self.state().input.split('\n').count()
    }

    pub async fn transcript(&self) -> Vec<Turn> {
        self.state().transcript.clone()
    }

    pub fn is_pending(&self) -> bool {
        self.busy.is_busy(Operation::Ask)
    }

    pub fn cancel_outstanding(&self) {
        self.cancellation.cancel_outstanding();
    }

    fn state(&self) -> MutexGuard<'_, ConversationState> {
        lock_state(&self.inner)
    }
}

#[cfg(test)]
#[path = "tests/conversation_tests.rs"]
mod tests;

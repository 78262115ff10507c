//! Chat coordinator — one question, one backend round trip, one answer.
//!
//! DESIGN
//! ======
//! The user's turn is appended before the request goes out so it can be
//! rendered immediately. The request carries the log as it stood *before*
//! that append in `chat_history`; the new question travels separately in
//! `question`. A 2xx reply must carry a non-empty string `answer`.
//!
//! TRADE-OFFS
//! ==========
//! A failed request is never rolled back: the question stays in the log,
//! settled `Unanswered`, and no assistant turn follows it. This keeps the
//! optimistic append free of reconciliation at the cost of leaving
//! unanswered questions visible. The turn is settled by a guard, so a caller
//! that stops waiting (timeout, dropped future) also leaves it `Unanswered`.
//!
//! ORDERING
//! ========
//! Nothing serializes concurrent `ask` calls. User turns land in call order;
//! assistant turns land in reply-arrival order, so the log can read
//! `user(A), user(B), assistant(B), assistant(A)` when B returns first.

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::conversation::{ConversationStore, Turn, TurnId, TurnStatus};
use crate::error::{ChatError, ErrorCode};
use crate::session::SessionId;
use crate::transport::{ChatRequest, Transport};

pub struct ChatCoordinator {
    transport: Arc<dyn Transport>,
}

impl ChatCoordinator {
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Ask `question` within `session_id`, recording both sides in `store`.
    ///
    /// `prior_history` is sent as `chat_history` and should be the log as it
    /// stood before this call. Returns `Ok(None)` without touching the log or
    /// the backend when the session is missing or the question is blank.
    ///
    /// # Errors
    ///
    /// - [`ChatError::Transport`] if the request fails or returns non-2xx.
    /// - [`ChatError::InvalidResponseShape`] if the reply has no usable `answer`.
    ///
    /// The user turn stays in `store` in both cases.
    pub async fn ask(
        &self,
        store: &ConversationStore,
        session_id: Option<&SessionId>,
        question: &str,
        prior_history: &[Turn],
    ) -> Result<Option<Turn>, ChatError> {
        self.ask_with_cancel(store, session_id, question, prior_history, &CancellationToken::new())
            .await
    }

    /// [`ChatCoordinator::ask`] that gives up when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`ChatCoordinator::ask`], plus [`ChatError::Cancelled`].
    pub async fn ask_with_cancel(
        &self,
        store: &ConversationStore,
        session_id: Option<&SessionId>,
        question: &str,
        prior_history: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<Option<Turn>, ChatError> {
        let Some(session_id) = session_id.filter(|s| !s.as_str().trim().is_empty()) else {
            debug!("chat: no session, ignoring submission");
            return Ok(None);
        };
        if question.trim().is_empty() {
            debug!(%session_id, "chat: blank question, ignoring submission");
            return Ok(None);
        }

        let user_turn = PendingTurn { store, id: store.append(Turn::user(question)) };
        info!(%session_id, history_len = prior_history.len(), "chat: question sent");

        let request = ChatRequest { session_id: session_id.as_str(), question, chat_history: prior_history };
        let reply = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(ChatError::Cancelled),
            result = self.transport.post_chat(&request) => result.map_err(ChatError::from),
        };

        match reply.and_then(|body| extract_answer(&body)) {
            Ok(answer) => {
                let turn = Turn::assistant(answer);
                store.append(turn.clone());
                user_turn.answered();
                info!(%session_id, "chat: answer received");
                Ok(Some(turn))
            }
            Err(e) => {
                drop(user_turn);
                match &e {
                    ChatError::InvalidResponseShape(detail) => {
                        warn!(%session_id, code = e.error_code(), %detail, "chat: backend reply violated answer contract");
                    }
                    _ => warn!(%session_id, code = e.error_code(), error = %e, "chat: request failed"),
                }
                Err(e)
            }
        }
    }
}

/// A user turn awaiting its reply. Settles `Unanswered` on drop unless
/// [`PendingTurn::answered`] ran first.
struct PendingTurn<'a> {
    store: &'a ConversationStore,
    id: TurnId,
}

impl PendingTurn<'_> {
    fn answered(self) {
        self.store.settle(self.id, TurnStatus::Answered);
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.store.settle(self.id, TurnStatus::Unanswered) {
            debug!(turn = self.id.index(), "chat: question left unanswered");
        }
    }
}

fn extract_answer(body: &Value) -> Result<String, ChatError> {
    match body.get("answer") {
        Some(Value::String(answer)) if !answer.is_empty() => Ok(answer.clone()),
        Some(Value::String(_)) => Err(ChatError::InvalidResponseShape("empty answer".to_string())),
        None | Some(Value::Null) => Err(ChatError::InvalidResponseShape("missing answer".to_string())),
        Some(other) => Err(ChatError::InvalidResponseShape(format!("answer is not a string: {other}"))),
    }
}

// =============================================================================
// CONVERSATION
// =============================================================================

/// A session's conversation: its id, its log, and the coordinator that grows it.
pub struct Conversation {
    session_id: Option<SessionId>,
    coordinator: ChatCoordinator,
    store: ConversationStore,
}

impl Conversation {
    /// `session_id` is `None` when the view was opened without one; every
    /// `ask` is then ignored.
    #[must_use]
    pub fn new(session_id: Option<SessionId>, transport: Arc<dyn Transport>) -> Self {
        Self { session_id, coordinator: ChatCoordinator::new(transport), store: ConversationStore::new() }
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session_id.as_ref()
    }

    #[must_use]
    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    #[must_use]
    pub fn turns(&self) -> Vec<Turn> {
        self.store.snapshot()
    }

    /// `true` while any question is still waiting for its answer.
    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.store.pending() > 0
    }

    /// Ask with the current log as history.
    ///
    /// # Errors
    ///
    /// See [`ChatCoordinator::ask`].
    pub async fn ask(&self, question: &str) -> Result<Option<Turn>, ChatError> {
        self.ask_with_cancel(question, &CancellationToken::new()).await
    }

    /// # Errors
    ///
    /// See [`ChatCoordinator::ask_with_cancel`].
    pub async fn ask_with_cancel(&self, question: &str, cancel: &CancellationToken) -> Result<Option<Turn>, ChatError> {
        let prior = self.store.snapshot();
        self.coordinator
            .ask_with_cancel(&self.store, self.session_id.as_ref(), question, &prior, cancel)
            .await
    }
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;

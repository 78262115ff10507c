//! Conversation store — the append-only turn log for one session.
//!
//! DESIGN
//! ======
//! The log is the single source of truth for what is rendered and what is
//! sent upstream as `chat_history`. Turns are only ever appended; order is
//! append order, and role alternation is not checked here.
//!
//! Each turn carries a local [`TurnStatus`]. A user turn starts `Pending` and
//! is settled once its request resolves, so a question whose answer never
//! arrived stays visible as `Unanswered` instead of disappearing. The status
//! never reaches the wire and settling it never touches role, content or
//! position.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// Local delivery state of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TurnStatus {
    /// Sent, reply not yet known.
    #[default]
    Pending,
    /// The backend answered (assistant turns are always `Answered`).
    Answered,
    /// The request failed or was cancelled; no assistant turn follows it.
    Unanswered,
}

/// Position of a turn in its log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TurnId(usize);

impl TurnId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// One message in a conversation. Serializes as `{role, content}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
    #[serde(skip)]
    pub status: TurnStatus,
}

impl Turn {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into(), status: TurnStatus::Pending }
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into(), status: TurnStatus::Answered }
    }
}

/// Ordered, append-only log of turns. Appends are serialized by an internal lock.
#[derive(Debug, Default)]
pub struct ConversationStore {
    turns: Mutex<Vec<Turn>>,
}

impl ConversationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn and return its position.
    pub fn append(&self, turn: Turn) -> TurnId {
        let mut turns = self
            .turns
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        turns.push(turn);
        TurnId(turns.len() - 1)
    }

    /// Copy of the log as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Turn> {
        self.turns
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of user turns still waiting for a reply.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.turns
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .filter(|t| t.status == TurnStatus::Pending)
            .count()
    }

    /// Resolve a pending turn. Settled turns keep their first resolution.
    ///
    /// Returns `false` if `id` is unknown or already settled.
    pub(crate) fn settle(&self, id: TurnId, status: TurnStatus) -> bool {
        let mut turns = self
            .turns
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        match turns.get_mut(id.0) {
            Some(turn) if turn.status == TurnStatus::Pending => {
                turn.status = status;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "conversation_test.rs"]
mod tests;

//! pdfchat — session-scoped upload-and-chat orchestration.
//!
//! ARCHITECTURE
//! ============
//! A document is uploaded under a freshly minted [`SessionId`]; once the
//! backend acknowledges it, the same id scopes a question-answer
//! conversation. Only [`transport`] touches the network. The coordinators in
//! [`upload`] and [`chat`] own sequencing, progress and failure handling, and
//! [`conversation`] is the append-only log both the UI and the backend see.
//!
//! ```text
//! file ─► SessionId::generate ─► UploadCoordinator ─► Transport::upload_pdf
//!                                       │
//!                                       ▼ UploadAck { session_id }
//! question ─► Conversation ─► ChatCoordinator ─► Transport::post_chat
//!                  │                 │
//!                  └──── ConversationStore (append-only) ◄──┘
//! ```

pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod session;
pub mod transport;
pub mod upload;

pub use chat::{ChatCoordinator, Conversation};
pub use config::ClientConfig;
pub use conversation::{ConversationStore, Role, Turn, TurnId, TurnStatus};
pub use error::{ChatError, ConfigError, ErrorCode, TransportError, UploadError, ValidationError};
pub use session::SessionId;
pub use transport::{HttpTransport, Transport};
pub use upload::progress::{ProgressReporter, ProgressTicker, SimulatedProgress, UploadPhase, UploadState, UploadTracker};
pub use upload::{Document, UploadAck, UploadCoordinator};

//! Transport — the only component that performs network I/O.
//!
//! DESIGN
//! ======
//! Two backend operations, `upload_pdf` and `post_chat`, behind the
//! [`Transport`] trait so coordinators can be driven by a mock in tests. The
//! transport holds no session or conversation state; it builds a request,
//! awaits the response, rejects non-2xx statuses and parses the body as JSON.
//! No retries and no timeouts beyond the HTTP client's connect timeout.

pub mod http;

use serde::Serialize;
use serde_json::Value;

use crate::conversation::Turn;
use crate::error::TransportError;
use crate::session::SessionId;
use crate::upload::Document;

pub use http::HttpTransport;

/// Body of `POST {base}/chat/`.
///
/// `chat_history` is the log as it stood before the question was appended;
/// the question itself travels only in `question`.
#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub session_id: &'a str,
    pub question: &'a str,
    pub chat_history: &'a [Turn],
}

#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Upload `document` as the multipart `file` field bound to `session_id`.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure, non-2xx status, or a
    /// body that is not JSON.
    async fn upload_pdf(&self, document: &Document, session_id: &SessionId) -> Result<Value, TransportError>;

    /// Send one chat request and return the raw JSON reply.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] on network failure, non-2xx status, or a
    /// body that is not JSON.
    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<Value, TransportError>;
}

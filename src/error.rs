//! Error taxonomy for the upload and chat flows.
//!
//! DESIGN
//! ======
//! Three kinds of failure exist: caller-correctable input problems
//! ([`ValidationError`]), network or non-success backend responses
//! ([`TransportError`]), and successful responses that break the answer
//! contract ([`ChatError::InvalidResponseShape`]). Every kind is recovered at
//! the coordinator boundary and collapses into one "try again" message per
//! operation via [`ErrorCode::user_message`]; codes stay distinct for logs.

/// Stable machine-readable code plus retry hint for an error.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }

    /// Message suitable for showing to the person who triggered the operation.
    fn user_message(&self) -> &'static str;
}

pub const UPLOAD_FAILED_MESSAGE: &str = "Error uploading file. Please try again.";
pub const CHAT_FAILED_MESSAGE: &str = "Failed to send message. Please try again.";
/// Shown for a transport failure that reached the caller without an operation
/// wrapper; [`UploadError`] and [`ChatError`] replace it with their own message.
pub const REQUEST_FAILED_MESSAGE: &str = "Request failed. Please try again.";

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The backend base URL is not an absolute http(s) URL.
    #[error("invalid API URL '{url}': {reason}")]
    InvalidApiUrl { url: String, reason: String },
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Input problems detected before any network I/O.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("no file")]
    NoFile,

    #[error("too large: {size} bytes exceeds the {limit} byte limit")]
    TooLarge { size: u64, limit: u64 },

    /// The tracker already drove an earlier upload; each attempt needs a fresh one.
    #[error("upload tracker already used (phase: {phase})")]
    TrackerReused { phase: &'static str },
}

impl ErrorCode for ValidationError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoFile => "E_NO_FILE",
            Self::TooLarge { .. } => "E_TOO_LARGE",
            Self::TrackerReused { .. } => "E_TRACKER_REUSED",
        }
    }

    fn user_message(&self) -> &'static str {
        UPLOAD_FAILED_MESSAGE
    }
}

// =============================================================================
// TRANSPORT
// =============================================================================

/// Errors produced by the transport client.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The request never produced a response (connect, DNS, body read).
    #[error("request failed: {0}")]
    Request(String),

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {status}")]
    Status { status: u16, body: String },

    /// The response body was not valid JSON.
    #[error("response parse failed: {0}")]
    Parse(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
}

impl ErrorCode for TransportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_REQUEST",
            Self::Status { .. } => "E_STATUS",
            Self::Parse(_) => "E_PARSE",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Status { status: 408 | 429 | 500..=599, .. })
    }

    fn user_message(&self) -> &'static str {
        REQUEST_FAILED_MESSAGE
    }
}

// =============================================================================
// UPLOAD
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("upload transport failed: {0}")]
    Transport(#[from] TransportError),

    #[error("upload cancelled")]
    Cancelled,
}

impl ErrorCode for UploadError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(e) => e.error_code(),
            Self::Transport(e) => e.error_code(),
            Self::Cancelled => "E_CANCELLED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Transport(e) => e.retryable(),
            Self::Cancelled => true,
        }
    }

    fn user_message(&self) -> &'static str {
        UPLOAD_FAILED_MESSAGE
    }
}

// =============================================================================
// CHAT
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("chat transport failed: {0}")]
    Transport(#[from] TransportError),

    /// The backend replied 2xx but without a usable `answer`.
    #[error("invalid response shape: {0}")]
    InvalidResponseShape(String),

    #[error("chat request cancelled")]
    Cancelled,
}

impl ErrorCode for ChatError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Transport(e) => e.error_code(),
            Self::InvalidResponseShape(_) => "E_INVALID_RESPONSE_SHAPE",
            Self::Cancelled => "E_CANCELLED",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Transport(e) => e.retryable(),
            Self::InvalidResponseShape(_) => false,
            Self::Cancelled => true,
        }
    }

    fn user_message(&self) -> &'static str {
        CHAT_FAILED_MESSAGE
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

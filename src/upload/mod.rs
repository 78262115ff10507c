//! Upload coordinator — binds a document to a session on the backend.
//!
//! DESIGN
//! ======
//! Validation (file present, size under the ceiling) happens before the
//! tracker leaves `idle` and before any network call. After that the upload
//! runs `uploading → finalizing → succeeded` or `uploading → failed`, with a
//! progress ticker running only while the request is outstanding.
//! Once the backend has confirmed, the attempt always ends `succeeded`, even
//! if the caller drops the future during the finalize hold.
//!
//! ERROR HANDLING
//! ==============
//! Every failure is terminal for the attempt. There is no automatic retry;
//! retrying means a new call with a new tracker (and normally a new session).

pub mod progress;

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ClientConfig;
use crate::error::{ErrorCode, UploadError, ValidationError};
use crate::session::SessionId;
use crate::transport::Transport;
use progress::{ProgressReporter, SimulatedProgress, UploadTracker};

/// A file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    file_name: String,
    bytes: Vec<u8>,
}

impl Document {
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes }
    }

    /// Read a document from disk, naming it after the path's final component.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the file cannot be read.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "document.pdf".to_string(), |n| n.to_string_lossy().into_owned());
        Ok(Self { file_name, bytes })
    }

    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[must_use]
    pub fn len(&self) -> u64 {
        self.bytes.len() as u64
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Successful upload: the session id to carry into the chat phase.
#[derive(Debug, Clone)]
pub struct UploadAck {
    pub session_id: SessionId,
    /// Backend reply body; not interpreted.
    pub response: Value,
}

pub struct UploadCoordinator {
    transport: Arc<dyn Transport>,
    progress: Arc<dyn ProgressReporter>,
    max_upload_bytes: u64,
    finalize_hold: std::time::Duration,
}

impl UploadCoordinator {
    /// Coordinator with simulated progress configured from `config`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, config: &ClientConfig) -> Self {
        Self::with_reporter(transport, Arc::new(SimulatedProgress::new(config.progress)), config)
    }

    /// Coordinator with a custom progress source.
    #[must_use]
    pub fn with_reporter(
        transport: Arc<dyn Transport>,
        progress: Arc<dyn ProgressReporter>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            transport,
            progress,
            max_upload_bytes: config.max_upload_bytes,
            finalize_hold: config.finalize_hold,
        }
    }

    /// Mint a fresh session and upload `file` under it.
    ///
    /// # Errors
    ///
    /// See [`UploadCoordinator::upload`].
    pub async fn upload_new(&self, file: Option<&Document>, tracker: &UploadTracker) -> Result<UploadAck, UploadError> {
        self.upload(file, SessionId::generate(), tracker).await
    }

    /// Upload `file` bound to `session_id`, reporting through `tracker`.
    ///
    /// # Errors
    ///
    /// - [`UploadError::Validation`] for a missing or oversized file, or a
    ///   tracker that already left `idle`; no network call is made.
    /// - [`UploadError::Transport`] if the backend is unreachable or rejects the upload.
    pub async fn upload(
        &self,
        file: Option<&Document>,
        session_id: SessionId,
        tracker: &UploadTracker,
    ) -> Result<UploadAck, UploadError> {
        self.upload_with_cancel(file, session_id, tracker, &CancellationToken::new())
            .await
    }

    /// [`UploadCoordinator::upload`] that stops early when `cancel` fires.
    ///
    /// # Errors
    ///
    /// As [`UploadCoordinator::upload`], plus [`UploadError::Cancelled`].
    pub async fn upload_with_cancel(
        &self,
        file: Option<&Document>,
        session_id: SessionId,
        tracker: &UploadTracker,
        cancel: &CancellationToken,
    ) -> Result<UploadAck, UploadError> {
        let document = match self.validate(file) {
            Ok(document) => document,
            Err(e) => {
                warn!(%session_id, code = e.error_code(), error = %e, "upload: rejected before send");
                return Err(e.into());
            }
        };
        tracker
            .begin()
            .map_err(|phase| ValidationError::TrackerReused { phase: phase.as_str() })?;

        info!(%session_id, file = document.file_name(), bytes = document.len(), "upload: started");
        let ticker = self.progress.start(tracker.clone());
        let outcome = tokio::select! {
            biased;
            () = cancel.cancelled() => Err(UploadError::Cancelled),
            result = self.transport.upload_pdf(document, &session_id) => result.map_err(UploadError::from),
        };
        ticker.stop();

        match outcome {
            Ok(response) => {
                let finalizing = Finalizing::enter(tracker);
                if !self.finalize_hold.is_zero() {
                    tokio::time::sleep(self.finalize_hold).await;
                }
                drop(finalizing);
                info!(%session_id, "upload: succeeded");
                Ok(UploadAck { session_id, response })
            }
            Err(e) => {
                tracker.fail();
                warn!(%session_id, code = e.error_code(), error = %e, "upload: failed");
                Err(e)
            }
        }
    }

    fn validate<'a>(&self, file: Option<&'a Document>) -> Result<&'a Document, ValidationError> {
        let document = file.ok_or(ValidationError::NoFile)?;
        if document.len() > self.max_upload_bytes {
            return Err(ValidationError::TooLarge { size: document.len(), limit: self.max_upload_bytes });
        }
        Ok(document)
    }
}

/// The backend has confirmed the upload; dropping this completes it, whether
/// the finalize hold ran out or the caller stopped waiting during it.
struct Finalizing<'a>(&'a UploadTracker);

impl<'a> Finalizing<'a> {
    fn enter(tracker: &'a UploadTracker) -> Self {
        tracker.finalize();
        Self(tracker)
    }
}

impl Drop for Finalizing<'_> {
    fn drop(&mut self) {
        self.0.succeed();
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

//! reqwest-backed transport.

use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};

use super::{ChatRequest, Transport};
use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::session::SessionId;
use crate::upload::Document;

const PDF_MIME: &str = "application/pdf";

pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// Build a transport for `config.api_url`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::HttpClientBuild`] if the HTTP client fails to build.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| TransportError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: config.api_url.trim_end_matches('/').to_string() })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn upload_pdf(&self, document: &Document, session_id: &SessionId) -> Result<Value, TransportError> {
        let url = format!("{}/upload-pdf/", self.base_url);
        let part = Part::bytes(document.bytes().to_vec())
            .file_name(document.file_name().to_string())
            .mime_str(PDF_MIME)
            .map_err(|e| TransportError::Request(e.to_string()))?;
        let form = Form::new().part("file", part);

        debug!(%session_id, bytes = document.len(), "transport: upload-pdf");
        let response = self
            .http
            .post(url)
            .query(&[("session_id", session_id.as_str())])
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        read_json(response).await
    }

    async fn post_chat(&self, request: &ChatRequest<'_>) -> Result<Value, TransportError> {
        let url = format!("{}/chat/", self.base_url);
        debug!(
            session_id = request.session_id,
            history_len = request.chat_history.len(),
            "transport: chat"
        );
        let response = self
            .http
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;
        read_json(response).await
    }
}

async fn read_json(response: reqwest::Response) -> Result<Value, TransportError> {
    let status = response.status();
    let text = response
        .text()
        .await
        .map_err(|e| TransportError::Request(e.to_string()))?;
    if !status.is_success() {
        warn!(status = status.as_u16(), "transport: backend returned non-success status");
        return Err(TransportError::Status { status: status.as_u16(), body: text });
    }
    serde_json::from_str(&text).map_err(|e| TransportError::Parse(e.to_string()))
}

#[cfg(test)]
#[path = "http_test.rs"]
mod tests;

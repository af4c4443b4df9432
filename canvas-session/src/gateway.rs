//! HTTP client for the regeneration service.
//!
//! The service executes an edited recipe against the uploaded data and
//! answers with the location of the new image:
//!
//! ```text
//! POST <base>/api/query-graph/
//! { "file_id": "...", "query": "<recipe>", "is_code_update": true }
//!
//! 200 { "images": ["/out/2.png"] } | { "image_path": "/out/2.png" }
//! 4xx/5xx { "error": "..." }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use canvas_core::RegenerationTicket;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::GatewayError;

/// Path of the regeneration endpoint relative to the service base URL.
pub const REGENERATION_PATH: &str = "api/query-graph/";

/// Body of a regeneration request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegenerationRequest {
    /// Upstream file/session reference.
    pub file_id: String,
    /// The edited recipe.
    pub query: String,
    /// Always `true`: the query is code, not natural language.
    pub is_code_update: bool,
}

impl From<&RegenerationTicket> for RegenerationRequest {
    fn from(ticket: &RegenerationTicket) -> Self {
        Self {
            file_id: ticket.file_id.clone(),
            query: ticket.recipe.clone(),
            is_code_update: true,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RegenerationResponse {
    #[serde(default)]
    images: Vec<String>,
    #[serde(default)]
    image_path: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl RegenerationResponse {
    /// First usable image location, or the service's error.
    fn into_image(self) -> Result<String, GatewayError> {
        if let Some(error) = self.error {
            return Err(GatewayError::Application(error));
        }
        self.images
            .into_iter()
            .chain(self.image_path)
            .find(|path| !path.trim().is_empty())
            .ok_or_else(|| GatewayError::Application("response contained no image".to_string()))
    }
}

/// Something that can turn an edited recipe into a new image.
#[async_trait]
pub trait RegenerationService: Send + Sync {
    /// Submit the request, returning the new image location.
    async fn regenerate(&self, request: &RegenerationRequest) -> Result<String, GatewayError>;
}

/// Regeneration over HTTP.
#[derive(Clone)]
pub struct HttpGateway {
    inner: Arc<InnerClient>,
}

struct InnerClient {
    http: Client,
    endpoint: Url,
}

impl HttpGateway {
    /// Create a gateway for the service at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidUrl`] if the URL is malformed.
    /// Returns [`GatewayError::Transport`] if the HTTP client fails to build.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let mut base = Url::parse(base_url).map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::InvalidUrl(format!("{base_url} cannot be a base URL")));
        }
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join(REGENERATION_PATH)
            .map_err(|e| GatewayError::InvalidUrl(e.to_string()))?;

        let http = Client::builder()
            .user_agent(concat!("canvas-session/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            // Disable proxy detection to avoid macOS system-configuration panic
            .no_proxy()
            .build()?;

        Ok(Self {
            inner: Arc::new(InnerClient { http, endpoint }),
        })
    }

    /// The resolved regeneration endpoint.
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }
}

#[async_trait]
impl RegenerationService for HttpGateway {
    async fn regenerate(&self, request: &RegenerationRequest) -> Result<String, GatewayError> {
        tracing::debug!("POST {} for file {}", self.inner.endpoint, request.file_id);
        let response = self
            .inner
            .http
            .post(self.inner.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let parsed: RegenerationResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::MalformedResponse(format!("HTTP {status}: {e}")))?;

        if !status.is_success() && parsed.error.is_none() {
            return Err(GatewayError::MalformedResponse(format!(
                "HTTP {status} without error detail"
            )));
        }
        parsed.into_image()
    }
}

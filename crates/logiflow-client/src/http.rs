//! Authenticated reqwest plumbing shared by the REST and GraphQL clients.

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use uuid::Uuid;

use logiflow_core::config::ApiConfig;
use logiflow_core::error::AppError;
use logiflow_core::traits::TokenProvider;

use crate::error::ClientError;

/// Correlation header attached to every request.
pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// A reqwest client that signs requests with the session's bearer token.
#[derive(Clone)]
pub(crate) struct Backend {
    client: Client,
    tokens: Arc<dyn TokenProvider>,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend").field("tokens", &self.tokens).finish()
    }
}

impl Backend {
    pub(crate) fn new(config: &ApiConfig, tokens: Arc<dyn TokenProvider>) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { client, tokens })
    }

    /// Start a request carrying `Authorization: Bearer` and a fresh request id.
    pub(crate) fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, ClientError> {
        let token = self.tokens.access_token().ok_or(ClientError::NotAuthenticated)?;
        let request_id = Uuid::new_v4();
        debug!(%method, url = %url, %request_id, "Backend request");
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(token)
            .header(REQUEST_ID_HEADER, request_id.to_string()))
    }
}

/// Send a request and decode a JSON success body.
pub(crate) async fn fetch_json<T: DeserializeOwned>(request: RequestBuilder) -> Result<T, ClientError> {
    let response = request
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;
    let response = success(response).await?;
    response
        .json::<T>()
        .await
        .map_err(|e| ClientError::Decode(e.to_string()))
}

async fn success(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    debug!(status = %status, "Backend rejected request");
    Err(ClientError::Status {
        status: status.as_u16(),
        message,
    })
}

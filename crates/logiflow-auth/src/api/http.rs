//! reqwest implementation of [`AuthApi`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Serialize;
use tracing::debug;

use logiflow_core::config::ApiConfig;
use logiflow_core::error::AppError;

use super::{AuthApi, LoginRequest, RefreshRequest, RefreshResponse, RegisterRequest, error_message};
use crate::error::{AuthError, DEFAULT_LOGIN_FAILURE, DEFAULT_REGISTER_FAILURE};

/// HTTP client for the auth service.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    client: Client,
    base_url: String,
}

impl HttpAuthApi {
    /// Build a client for `config.auth_url` with the configured timeout.
    pub fn new(config: &ApiConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| AppError::configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.auth_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<Response, AuthError> {
        let url = self.url(path);
        debug!(url = %url, "Auth request");
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))
    }
}

/// Read the body of a failed response into an [`AuthError::InvalidCredentials`].
async fn rejection(response: Response, fallback: &str) -> AuthError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(status = %status, "Auth service rejected request");
    AuthError::InvalidCredentials(error_message(&body).unwrap_or_else(|| fallback.to_string()))
}

#[async_trait]
impl AuthApi for HttpAuthApi {
    async fn login(&self, request: &LoginRequest) -> Result<String, AuthError> {
        let response = self.post("/api/auth/login", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response, DEFAULT_LOGIN_FAILURE).await);
        }
        response
            .text()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<RefreshResponse, AuthError> {
        let response = self.post("/api/auth/token/refresh", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response, DEFAULT_LOGIN_FAILURE).await);
        }
        let body = response
            .text()
            .await
            .map_err(|e| AuthError::NetworkFailure(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| AuthError::MalformedResponse(e.to_string()))
    }

    async fn register(&self, request: &RegisterRequest) -> Result<(), AuthError> {
        let response = self.post("/api/auth/register", request).await?;
        if !response.status().is_success() {
            return Err(rejection(response, DEFAULT_REGISTER_FAILURE).await);
        }
        Ok(())
    }
}

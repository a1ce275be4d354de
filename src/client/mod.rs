//! HTTP client for the diagnosis backend.
//!
//! Wraps every backend call the client needs: health, diagnosis, auth
//! and per-user history. Failures are normalized into `ClientError`;
//! nothing here retries.

pub mod error;
pub mod mapping;
pub mod protocol;

pub use error::ClientError;
pub use mapping::{outcome_from_response, MISSING_ICD10, UNDETERMINED_DIAGNOSIS};
pub use protocol::protocol_lookup_url;

use reqwest::header::AUTHORIZATION;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::config::{ClientConfig, MockFallback, CONNECT_TIMEOUT};
use crate::models::auth::{default_display_name, LoginRequest, RegisterRequest};
use crate::models::diagnosis::{DiagnoseRequest, NewHistoryItem};
use crate::models::{
    AuthResponse, AuthUser, BackendDiagnosisResponse, DiagnosisOutcome, DiagnosisResult,
    HealthReport, HistoryPage,
};

/// Error-body fields consulted for the diagnosis endpoint.
const DIAGNOSE_ERROR_FIELDS: &[&str] = &["detail", "message", "error"];
/// Error-body fields consulted for auth and history endpoints.
const AUTH_ERROR_FIELDS: &[&str] = &["detail", "error"];

/// Backend HTTP client. Cloning shares the connection pool.
#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: reqwest::Client,
    mock_fallback: MockFallback,
}

impl BackendClient {
    /// Client for `base_url` with default timeouts and no mock fallback.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig {
            backend_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ClientError::Builder(e.to_string()))?;

        Ok(Self {
            base_url: config.backend_url.trim_end_matches('/').to_string(),
            http,
            mock_fallback: config.mock_fallback,
        })
    }

    pub fn with_mock_fallback(mut self, mock_fallback: MockFallback) -> Self {
        self.mock_fallback = mock_fallback;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `/history/<id>` with the id percent-encoded as one path segment.
    fn history_item_url(&self, id: &str) -> Result<String, ClientError> {
        let mut url = reqwest::Url::parse(&self.url("/history"))
            .map_err(|e| ClientError::Builder(format!("invalid backend URL: {e}")))?;
        url.path_segments_mut()
            .map_err(|()| ClientError::Builder("backend URL cannot take a path".to_string()))?
            .push(id);
        Ok(url.into())
    }

    // ── Health ──────────────────────────────────────────────

    /// `GET /health`. Any failure collapses to `HealthCheckFailed`.
    pub async fn check_health(&self) -> Result<HealthReport, ClientError> {
        let url = self.url("/health");
        let response = self.http.get(&url).send().await.map_err(|e| {
            tracing::debug!(error = %e, "health request failed");
            ClientError::HealthCheckFailed
        })?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "health endpoint returned error");
            return Err(ClientError::HealthCheckFailed);
        }

        response.json().await.map_err(|e| {
            tracing::debug!(error = %e, "health body not decodable");
            ClientError::HealthCheckFailed
        })
    }

    // ── Diagnosis ───────────────────────────────────────────

    /// `POST /diagnose` with free-text anamnesis.
    ///
    /// With `MockFallback::Enabled`, a network failure yields the fixed
    /// demo outcome instead of an error.
    pub async fn submit_diagnosis(
        &self,
        text: &str,
        token: Option<&str>,
    ) -> Result<DiagnosisOutcome, ClientError> {
        if text.trim().is_empty() {
            return Err(ClientError::InvalidInput(
                "Введите описание симптомов.".to_string(),
            ));
        }
        let url = self.url("/diagnose");
        let request = with_bearer(
            self.http.post(&url).json(&DiagnoseRequest { query: text }),
            token,
        );

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = ClientError::from_transport(&url, e);
                if self.mock_fallback == MockFallback::Enabled {
                    tracing::warn!(error = %err, "backend unreachable, returning demo diagnosis");
                    return Ok(mapping::demo_outcome());
                }
                return Err(err);
            }
        };

        let parsed: BackendDiagnosisResponse = decode(
            &url,
            response,
            DIAGNOSE_ERROR_FIELDS,
            "Diagnosis request failed",
        )
        .await?;

        tracing::info!(candidates = parsed.diagnoses.len(), "diagnosis received");
        Ok(outcome_from_response(parsed))
    }

    // ── Auth ────────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ClientError> {
        let url = self.url("/auth/login");
        let response = self
            .http
            .post(&url)
            .json(&LoginRequest { email, password })
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        decode(&url, response, AUTH_ERROR_FIELDS, "Invalid credentials").await
    }

    /// Register a new account. `name` defaults to the email's local part.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthResponse, ClientError> {
        let url = self.url("/auth/register");
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| default_display_name(email));

        let response = self
            .http
            .post(&url)
            .json(&RegisterRequest {
                email,
                password,
                name,
            })
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        decode(&url, response, AUTH_ERROR_FIELDS, "Registration failed").await
    }

    /// `GET /auth/me`. A rejected token yields `Ok(None)`.
    pub async fn fetch_me(&self, token: &str) -> Result<Option<AuthUser>, ClientError> {
        let url = self.url("/auth/me");
        let response = with_bearer(self.http.get(&url), Some(token))
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "session token rejected");
            return Ok(None);
        }
        decode(&url, response, AUTH_ERROR_FIELDS, "").await.map(Some)
    }

    // ── History ─────────────────────────────────────────────

    pub async fn fetch_history(&self, token: &str) -> Result<Vec<DiagnosisResult>, ClientError> {
        let url = self.url("/history");
        let response = self
            .authed(self.http.get(&url), token)?
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        let page: HistoryPage =
            decode(&url, response, AUTH_ERROR_FIELDS, "Failed to load history").await?;
        Ok(page.items)
    }

    /// Store a result server-side; returns the backend's copy (with its id).
    pub async fn save_history_item(
        &self,
        token: &str,
        item: &DiagnosisResult,
    ) -> Result<DiagnosisResult, ClientError> {
        let url = self.url("/history");
        let request = self
            .authed(self.http.post(&url), token)?
            .json(&NewHistoryItem::from(item));
        let response = request
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        decode(&url, response, AUTH_ERROR_FIELDS, "Failed to save history").await
    }

    pub async fn delete_history_item(&self, token: &str, id: &str) -> Result<(), ClientError> {
        let url = self.history_item_url(id)?;
        let response = self
            .authed(self.http.delete(&url), token)?
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        expect_success(response, "Failed to delete").await
    }

    pub async fn clear_history(&self, token: &str) -> Result<(), ClientError> {
        let url = self.url("/history");
        let response = self
            .authed(self.http.delete(&url), token)?
            .send()
            .await
            .map_err(|e| ClientError::from_transport(&url, e))?;

        expect_success(response, "Failed to clear history").await
    }

    fn authed(&self, request: RequestBuilder, token: &str) -> Result<RequestBuilder, ClientError> {
        if token.trim().is_empty() {
            return Err(ClientError::Unauthenticated);
        }
        Ok(with_bearer(request, Some(token)))
    }
}

fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token.map(str::trim).filter(|t| !t.is_empty()) {
        Some(token) => request.header(AUTHORIZATION, format!("Bearer {token}")),
        None => request,
    }
}

/// Decode a JSON body, or turn a non-2xx response into `ClientError::Http`.
async fn decode<T: DeserializeOwned>(
    url: &str,
    response: Response,
    error_fields: &[&str],
    fallback: &str,
) -> Result<T, ClientError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ClientError::from_transport(url, e))?;

    if !status.is_success() {
        tracing::debug!(%status, url, "backend returned error status");
        return Err(ClientError::from_response_body(
            status,
            &body,
            error_fields,
            fallback,
        ));
    }

    serde_json::from_str(&body).map_err(|e| {
        tracing::warn!(error = %e, url, "backend body is not the expected JSON");
        ClientError::MalformedJson {
            status: status.as_u16(),
            body,
        }
    })
}

async fn expect_success(response: Response, fallback: &str) -> Result<(), ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(ClientError::from_response_body(
        status,
        &body,
        AUTH_ERROR_FIELDS,
        fallback,
    ))
}

//! Client error taxonomy.

use reqwest::StatusCode;

/// Errors surfaced by `BackendClient`.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Backend down, DNS failure, refused connection or timeout.
    #[error("Cannot reach backend at {url}: {message}")]
    Network { url: String, message: String },
    /// Non-2xx response. `detail` keeps the raw body when it was not JSON.
    #[error("Backend returned {status}: {message}")]
    Http {
        status: u16,
        message: String,
        detail: Option<String>,
    },
    /// 2xx response whose body could not be decoded.
    #[error("Malformed response from backend (status {status})")]
    MalformedJson { status: u16, body: String },
    #[error("Health check failed")]
    HealthCheckFailed,
    #[error("Not logged in")]
    Unauthenticated,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("HTTP client error: {0}")]
    Builder(String),
}

impl ClientError {
    /// HTTP status of the failed exchange, when one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } | Self::MalformedJson { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }

    /// Message suitable for an inline, dismissible error line.
    pub fn user_message(&self) -> String {
        match self {
            Self::Network { .. } => {
                "Сервис диагностики временно недоступен. Повторите попытку.".to_string()
            }
            Self::Http { status: 503, .. } => {
                "Сервис временно недоступен. Проверьте, запущен ли бэкенд.".to_string()
            }
            Self::Http { status: 422, .. } => {
                "Некорректный запрос. Проверьте текст анамнеза.".to_string()
            }
            Self::Http {
                status, message, ..
            } => {
                if message.is_empty() {
                    format!("Ошибка сервера ({status})")
                } else {
                    message.clone()
                }
            }
            Self::MalformedJson { .. } => "Некорректный ответ сервера.".to_string(),
            Self::HealthCheckFailed => "Health check failed".to_string(),
            Self::Unauthenticated => "Требуется вход в систему.".to_string(),
            Self::InvalidInput(message) => message.clone(),
            Self::Builder(message) => message.clone(),
        }
    }

    pub(crate) fn from_transport(url: &str, err: reqwest::Error) -> Self {
        let message = if err.is_timeout() {
            "request timed out".to_string()
        } else if err.is_connect() {
            "connection failed".to_string()
        } else {
            err.to_string()
        };
        Self::Network {
            url: url.to_string(),
            message,
        }
    }

    /// Build an `Http` error from a non-2xx body.
    ///
    /// The message comes from the first string field in `fields` found in a
    /// JSON body, else `fallback`. Non-JSON bodies are kept as `detail`.
    pub(crate) fn from_response_body(
        status: StatusCode,
        body: &str,
        fields: &[&str],
        fallback: &str,
    ) -> Self {
        let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
        let (message, detail) = match parsed {
            Some(json) => {
                let message = fields
                    .iter()
                    .find_map(|field| json.get(*field).and_then(|v| v.as_str()))
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);
                let detail = json.get("detail").map(|d| match d.as_str() {
                    Some(s) => s.to_string(),
                    None => d.to_string(),
                });
                (message, detail)
            }
            None => {
                let text = body.trim();
                (None, (!text.is_empty()).then(|| text.to_string()))
            }
        };

        Self::Http {
            status: status.as_u16(),
            message: message.unwrap_or_else(|| fallback.to_string()),
            detail,
        }
    }
}

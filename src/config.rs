use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "clindiag";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Backend used when nothing is configured (local FastAPI dev server).
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8080";

/// Path prefix under which the relay forwards requests to the backend.
pub const DEFAULT_PROXY_PREFIX: &str = "/api/backend";

/// Default listen address for `serve-proxy`.
pub const DEFAULT_PROXY_BIND: &str = "127.0.0.1:3000";

/// Health polling cadence.
pub const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Extra health attempts per poll before the backend counts as unreachable.
pub const HEALTH_RETRIES: u32 = 2;

/// Pause between health retries.
pub const HEALTH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Diagnosis generation can take a while on the backend (LLM + retrieval).
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variables
pub const ENV_BACKEND_URL: &str = "CLINDIAG_BACKEND_URL";
pub const ENV_BACKEND_URL_FALLBACK: &str = "BACKEND_URL";
pub const ENV_MOCK_FALLBACK: &str = "CLINDIAG_MOCK_FALLBACK";
pub const ENV_DEV_MODE: &str = "CLINDIAG_DEV";
pub const ENV_DATA_DIR: &str = "CLINDIAG_DATA_DIR";

/// Default tracing filter when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "clindiag_lib=info,clindiag=info,warn"
}

/// Get the application data directory.
/// Holds the persisted session, local history and settings.
pub fn app_data_dir() -> PathBuf {
    match dirs::data_local_dir() {
        Some(dir) => dir.join(APP_NAME),
        None => PathBuf::from(format!(".{APP_NAME}")),
    }
}

// ═══════════════════════════════════════════════════════════
// Runtime configuration
// ═══════════════════════════════════════════════════════════

/// Whether a network failure during diagnosis submission is masked with a
/// fixed demo result. Off unless explicitly enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MockFallback {
    #[default]
    Disabled,
    Enabled,
}

/// Client configuration resolved from the environment.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub backend_url: String,
    pub mock_fallback: MockFallback,
    /// Dev mode reports an unreachable backend as online, like a local dev build.
    pub dev_mode: bool,
    pub data_dir: PathBuf,
    pub request_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            mock_fallback: MockFallback::Disabled,
            dev_mode: false,
            data_dir: app_data_dir(),
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl ClientConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = non_empty(ENV_BACKEND_URL)
            .or_else(|| non_empty(ENV_BACKEND_URL_FALLBACK))
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());

        let mock_fallback = if non_empty(ENV_MOCK_FALLBACK).as_deref().is_some_and(parse_flag) {
            MockFallback::Enabled
        } else {
            MockFallback::Disabled
        };

        let dev_mode = non_empty(ENV_DEV_MODE).as_deref().is_some_and(parse_flag);

        let data_dir = non_empty(ENV_DATA_DIR)
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);

        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            mock_fallback,
            dev_mode,
            data_dir,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

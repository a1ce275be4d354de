//! Shared client state.
//!
//! `CoreState` owns the backend client, the storage backend and every
//! store, and hands out the workflow objects built on top of them. It is
//! created once at startup and shared behind an `Arc`.

use std::sync::Arc;

use crate::client::{BackendClient, ClientError};
use crate::config::ClientConfig;
use crate::models::AuthUser;
use crate::storage::{FileStorage, KeyValueStorage, StorageError};
use crate::stores::{
    AuthStore, DiagnosisStore, HealthMonitor, HealthPolicy, HealthStore, HistoryStore,
    SettingsStore,
};
use crate::workflow::{DiagnosisWorkflow, HistoryView};

// ═══════════════════════════════════════════════════════════
// CoreState
// ═══════════════════════════════════════════════════════════

pub struct CoreState {
    pub config: ClientConfig,
    pub client: BackendClient,
    pub auth: Arc<AuthStore>,
    pub history: Arc<HistoryStore>,
    pub settings: Arc<SettingsStore>,
    pub diagnosis: Arc<DiagnosisStore>,
    pub health: Arc<HealthStore>,
}

impl CoreState {
    /// Open state persisted under `config.data_dir`.
    pub fn open(config: ClientConfig) -> Result<Self, CoreError> {
        let storage = FileStorage::open(&config.data_dir)?;
        tracing::debug!(dir = %storage.dir().display(), "storage opened");
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build state over an explicit storage backend.
    pub fn with_storage(
        config: ClientConfig,
        storage: Arc<dyn KeyValueStorage>,
    ) -> Result<Self, CoreError> {
        let client = BackendClient::from_config(&config)?;
        Ok(Self {
            auth: Arc::new(AuthStore::open(storage.clone())),
            history: Arc::new(HistoryStore::open(storage.clone())),
            settings: Arc::new(SettingsStore::open(storage)),
            diagnosis: Arc::new(DiagnosisStore::new()),
            health: Arc::new(HealthStore::new()),
            client,
            config,
        })
    }

    pub fn workflow(&self) -> DiagnosisWorkflow {
        DiagnosisWorkflow::new(
            self.client.clone(),
            self.diagnosis.clone(),
            self.history.clone(),
            self.auth.clone(),
        )
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView::new(self.client.clone(), self.history.clone(), self.auth.clone())
    }

    pub fn health_policy(&self) -> HealthPolicy {
        HealthPolicy::from_config(&self.config)
    }

    pub fn start_health_monitor(&self) -> HealthMonitor {
        HealthMonitor::spawn(self.client.clone(), self.health.clone(), self.health_policy())
    }

    // ── Session ─────────────────────────────────────────────

    pub async fn login(&self, email: &str, password: &str) -> Result<AuthUser, CoreError> {
        let response = self.client.login(email, password).await?;
        self.auth.login(response.user.clone(), response.access_token)?;
        tracing::info!(user = %response.user.id, "logged in");
        Ok(response.user)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<AuthUser, CoreError> {
        let response = self.client.register(email, password, name).await?;
        self.auth.login(response.user.clone(), response.access_token)?;
        tracing::info!(user = %response.user.id, "registered");
        Ok(response.user)
    }

    pub fn logout(&self) -> Result<(), CoreError> {
        self.auth.logout()?;
        tracing::info!("logged out");
        Ok(())
    }

    /// Re-validate the stored token with `/auth/me`.
    ///
    /// A rejected token ends the session. Network errors leave it intact.
    pub async fn refresh_session(&self) -> Result<Option<AuthUser>, CoreError> {
        let Some(token) = self.auth.token() else {
            return Ok(None);
        };
        match self.client.fetch_me(&token).await? {
            Some(user) => {
                self.auth.set_user(user.clone())?;
                Ok(Some(user))
            }
            None => {
                tracing::info!("stored session rejected by backend");
                self.auth.logout()?;
                Ok(None)
            }
        }
    }
}

/// Errors from CoreState operations.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

impl CoreError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => e.user_message(),
            Self::Storage(e) => e.to_string(),
        }
    }
}

//! Submission orchestration and history source selection.
//!
//! `DiagnosisWorkflow` drives one anamnesis through the diagnosis store,
//! the backend client and history. `HistoryView` answers history queries
//! from the backend when a session exists and from the local store
//! otherwise.

use std::sync::Arc;
use std::time::Duration;

use crate::client::{BackendClient, ClientError};
use crate::input;
use crate::models::DiagnosisResult;
use crate::storage::StorageError;
use crate::stores::history::filter_items;
use crate::stores::{AuthStore, DiagnosisStore, HistoryStore, SubmissionRejected};

/// Labels shown while a request is in flight, in order.
pub const PROGRESS_STEPS: [&str; 3] = [
    "Извлечение симптомов…",
    "Поиск клинических протоколов…",
    "Генерация диагноза…",
];

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Rejected(#[from] SubmissionRejected),
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl WorkflowError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Client(e) => input::rewrite_backend_error(&e.user_message()),
            other => other.to_string(),
        }
    }
}

/// Delay before each progress label. Purely cosmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressPacing {
    pub step_delay: Duration,
}

impl Default for ProgressPacing {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(500),
        }
    }
}

impl ProgressPacing {
    pub fn none() -> Self {
        Self {
            step_delay: Duration::ZERO,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// DiagnosisWorkflow
// ═══════════════════════════════════════════════════════════

#[derive(Clone)]
pub struct DiagnosisWorkflow {
    client: BackendClient,
    diagnosis: Arc<DiagnosisStore>,
    history: Arc<HistoryStore>,
    auth: Arc<AuthStore>,
    pacing: ProgressPacing,
}

impl DiagnosisWorkflow {
    pub fn new(
        client: BackendClient,
        diagnosis: Arc<DiagnosisStore>,
        history: Arc<HistoryStore>,
        auth: Arc<AuthStore>,
    ) -> Self {
        Self {
            client,
            diagnosis,
            history,
            auth,
            pacing: ProgressPacing::default(),
        }
    }

    pub fn with_pacing(mut self, pacing: ProgressPacing) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn diagnosis(&self) -> &Arc<DiagnosisStore> {
        &self.diagnosis
    }

    /// Submit the store's current input.
    ///
    /// On failure the store holds the user-facing message and the error is
    /// also returned. The store never stays in `Submitting`, even when this future is dropped.
    pub async fn submit(&self) -> Result<DiagnosisResult, WorkflowError> {
        let text = self.diagnosis.begin_submission()?;
        let mut in_flight = InFlight::new(&self.diagnosis);
        let token = self.auth.token();
        let authenticated = self.auth.is_authenticated();
        tracing::info!(chars = text.chars().count(), authenticated, "submitting anamnesis");

        let outcome = {
            let request = self.client.submit_diagnosis(&text, token.as_deref());
            tokio::pin!(request);
            tokio::select! {
                biased;
                outcome = &mut request => outcome,
                () = self.pace_progress() => request.await,
            }
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                let err = WorkflowError::Client(e);
                tracing::warn!(error = %err, "diagnosis failed");
                in_flight.disarm();
                self.diagnosis.fail(err.user_message());
                return Err(err);
            }
        };

        let result = DiagnosisResult::from_outcome(
            uuid::Uuid::new_v4().to_string(),
            outcome,
            chrono::Utc::now().timestamp_millis(),
            input::preview(&text),
            Some(text),
        );

        // Signed-in diagnoses are stored by the backend itself.
        if !authenticated {
            if let Err(e) = self.history.add_item(result.clone()) {
                tracing::warn!(error = %e, "failed to save local history");
            }
        }

        in_flight.disarm();
        self.diagnosis.complete(result.clone());
        Ok(result)
    }

    async fn pace_progress(&self) {
        for step in PROGRESS_STEPS {
            tokio::time::sleep(self.pacing.step_delay).await;
            self.diagnosis.advance_progress(step);
        }
    }
}

/// Returns the store to `Idle` if `submit` is dropped before it finishes.
struct InFlight<'a> {
    store: &'a DiagnosisStore,
    armed: bool,
}

impl<'a> InFlight<'a> {
    fn new(store: &'a DiagnosisStore) -> Self {
        Self { store, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!("diagnosis request abandoned");
            self.store.abandon();
        }
    }
}

// ═══════════════════════════════════════════════════════════
// HistoryView
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    Server,
    Local,
}

#[derive(Clone)]
pub struct HistoryView {
    client: BackendClient,
    history: Arc<HistoryStore>,
    auth: Arc<AuthStore>,
}

impl HistoryView {
    pub fn new(client: BackendClient, history: Arc<HistoryStore>, auth: Arc<AuthStore>) -> Self {
        Self {
            client,
            history,
            auth,
        }
    }

    pub fn source(&self) -> HistorySource {
        if self.auth.is_authenticated() {
            HistorySource::Server
        } else {
            HistorySource::Local
        }
    }

    fn server_token(&self) -> Option<String> {
        match self.source() {
            HistorySource::Server => self.auth.token(),
            HistorySource::Local => None,
        }
    }

    pub async fn list(&self, query: &str) -> Result<Vec<DiagnosisResult>, WorkflowError> {
        match self.server_token() {
            Some(token) => {
                let items = self.client.fetch_history(&token).await?;
                Ok(filter_items(&items, query))
            }
            None => Ok(self.history.filtered(query)),
        }
    }

    /// Returns whether an entry was removed.
    pub async fn remove(&self, id: &str) -> Result<bool, WorkflowError> {
        match self.server_token() {
            Some(token) => match self.client.delete_history_item(&token, id).await {
                Ok(()) => Ok(true),
                Err(e) if e.status() == Some(404) => Ok(false),
                Err(e) => Err(e.into()),
            },
            None => Ok(self.history.remove_item(id)?),
        }
    }

    pub async fn clear(&self) -> Result<(), WorkflowError> {
        match self.server_token() {
            Some(token) => Ok(self.client.clear_history(&token).await?),
            None => Ok(self.history.clear_all()?),
        }
    }
}

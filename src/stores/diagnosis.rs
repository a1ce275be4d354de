//! Diagnosis form state: `Idle → Submitting → {Success, Error}`.

use serde::Serialize;

use super::Store;
use crate::input::{self, InputError};
use crate::models::{DiagnosisPhase, DiagnosisResult};

#[derive(Debug, Clone, Default, Serialize)]
pub struct DiagnosisState {
    pub input: String,
    pub phase: DiagnosisPhase,
    /// Human-readable pacing label while submitting.
    pub progress_step: Option<String>,
    pub result: Option<DiagnosisResult>,
    pub error: Option<String>,
}

impl DiagnosisState {
    pub fn is_submitting(&self) -> bool {
        self.phase == DiagnosisPhase::Submitting
    }

    /// Submit control is enabled only for valid input with nothing in flight.
    pub fn can_submit(&self) -> bool {
        !self.is_submitting() && input::validate_input(&self.input).is_ok()
    }
}

/// Why a submission did not start.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionRejected {
    #[error("A diagnosis request is already in progress")]
    InFlight,
    #[error(transparent)]
    Invalid(#[from] InputError),
}

#[derive(Default)]
pub struct DiagnosisStore {
    state: Store<DiagnosisState>,
}

impl DiagnosisStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> DiagnosisState {
        self.state.get()
    }

    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<DiagnosisState> {
        self.state.subscribe()
    }

    pub fn is_submit_enabled(&self) -> bool {
        self.state.with(DiagnosisState::can_submit)
    }

    /// Accept new input text, sanitized. Ignored while a request is in flight.
    pub fn set_input(&self, raw: &str) -> bool {
        let clean = input::sanitize_input(raw);
        self.state.update_if(|s| {
            if s.is_submitting() || s.input == clean {
                return false;
            }
            s.input = clean;
            true
        })
    }

    /// Enter `Submitting` and return the input to send.
    pub fn begin_submission(&self) -> Result<String, SubmissionRejected> {
        self.state.update(|s| {
            if s.is_submitting() {
                return Err(SubmissionRejected::InFlight);
            }
            input::validate_input(&s.input)?;
            s.phase = DiagnosisPhase::Submitting;
            s.error = None;
            Ok(s.input.clone())
        })
    }

    pub fn advance_progress(&self, step: &str) {
        self.state.update_if(|s| {
            if !s.is_submitting() {
                return false;
            }
            s.progress_step = Some(step.to_string());
            true
        });
    }

    /// Leave `Submitting` without a result or error.
    pub fn abandon(&self) {
        self.state.update_if(|s| {
            if !s.is_submitting() {
                return false;
            }
            s.phase = DiagnosisPhase::Idle;
            s.progress_step = None;
            true
        });
    }

    pub fn complete(&self, result: DiagnosisResult) {
        self.state.update(|s| {
            s.phase = DiagnosisPhase::Success;
            s.progress_step = None;
            s.error = None;
            s.result = Some(result);
        });
    }

    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.state.update(|s| {
            s.phase = DiagnosisPhase::Error;
            s.progress_step = None;
            s.error = Some(message);
        });
    }

    pub fn dismiss_error(&self) {
        self.state.update_if(|s| {
            if s.error.is_none() {
                return false;
            }
            s.error = None;
            if s.phase == DiagnosisPhase::Error {
                s.phase = DiagnosisPhase::Idle;
            }
            true
        });
    }

    pub fn clear(&self) {
        self.state.set(DiagnosisState::default());
    }
}

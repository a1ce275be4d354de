pub mod auth;
pub mod diagnosis;
pub mod enums;
pub mod health;

pub use auth::{AuthResponse, AuthUser};
pub use diagnosis::{
    BackendDiagnosisItem, BackendDiagnosisResponse, DiagnosisOutcome, DiagnosisResult,
    DifferentialDiagnosis, HistoryPage,
};
pub use enums::{DiagnosisPhase, HealthState, InvalidEnum, Theme};
pub use health::{HealthReport, HealthStatus};

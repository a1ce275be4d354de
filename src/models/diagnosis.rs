use serde::{Deserialize, Deserializer, Serialize};

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Alternative candidate ranked below the primary diagnosis.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DifferentialDiagnosis {
    #[serde(deserialize_with = "null_as_default")]
    pub diagnosis: String,
    #[serde(deserialize_with = "null_as_default")]
    pub icd10_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub reasoning: String,
}

/// Content of a diagnosis answer, before it gets an id and timestamp.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DiagnosisOutcome {
    pub primary_diagnosis: String,
    pub icd10_code: String,
    pub confidence_score: Option<f64>,
    pub protocol_reference: Option<String>,
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    pub raw_protocol_snippets: Option<Vec<String>>,
}

/// A stored diagnosis, as kept in local history and exchanged with `/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosisResult {
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub primary_diagnosis: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub icd10_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol_reference: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub differential_diagnoses: Vec<DifferentialDiagnosis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_protocol_snippets: Option<Vec<String>>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: i64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub input_preview: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_text: Option<String>,
}

impl DiagnosisResult {
    /// Attach identity and input to a fresh outcome.
    pub fn from_outcome(
        id: String,
        outcome: DiagnosisOutcome,
        timestamp: i64,
        input_preview: String,
        input_text: Option<String>,
    ) -> Self {
        Self {
            id,
            primary_diagnosis: outcome.primary_diagnosis,
            icd10_code: outcome.icd10_code,
            confidence_score: outcome.confidence_score,
            protocol_reference: outcome.protocol_reference,
            differential_diagnoses: outcome.differential_diagnoses,
            raw_protocol_snippets: outcome.raw_protocol_snippets,
            timestamp,
            input_preview,
            input_text,
        }
    }

    /// Case-insensitive match on diagnosis, code and input preview.
    /// `needle` must already be lowercased.
    pub fn matches(&self, needle: &str) -> bool {
        self.primary_diagnosis.to_lowercase().contains(needle)
            || self.icd10_code.to_lowercase().contains(needle)
            || self.input_preview.to_lowercase().contains(needle)
    }
}

// ═══════════════════════════════════════════════════════════
// Backend wire types
// ═══════════════════════════════════════════════════════════

/// Request body for `POST /diagnose`.
#[derive(Debug, Serialize)]
pub struct DiagnoseRequest<'a> {
    pub query: &'a str,
}

/// One ranked candidate from `POST /diagnose`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendDiagnosisItem {
    pub rank: Option<u32>,
    #[serde(deserialize_with = "null_as_default")]
    pub icd10_code: String,
    #[serde(deserialize_with = "null_as_default")]
    pub diagnosis: String,
    #[serde(deserialize_with = "null_as_default")]
    pub explanation: String,
    #[serde(deserialize_with = "null_as_default")]
    pub protocol_id: String,
    pub medelement_url: Option<String>,
}

/// Response body from `POST /diagnose`, ordered most-relevant-first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BackendDiagnosisResponse {
    #[serde(default)]
    pub diagnoses: Vec<BackendDiagnosisItem>,
}

/// Request body for `POST /history`. The backend assigns id and timestamp.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewHistoryItem<'a> {
    pub primary_diagnosis: &'a str,
    pub icd10_code: &'a str,
    pub confidence_score: Option<f64>,
    pub protocol_reference: Option<&'a str>,
    pub differential_diagnoses: &'a [DifferentialDiagnosis],
    pub raw_protocol_snippets: Option<&'a [String]>,
    pub input_preview: &'a str,
    pub input_text: Option<&'a str>,
}

impl<'a> From<&'a DiagnosisResult> for NewHistoryItem<'a> {
    fn from(item: &'a DiagnosisResult) -> Self {
        Self {
            primary_diagnosis: &item.primary_diagnosis,
            icd10_code: &item.icd10_code,
            confidence_score: item.confidence_score,
            protocol_reference: item.protocol_reference.as_deref(),
            differential_diagnoses: &item.differential_diagnoses,
            raw_protocol_snippets: item.raw_protocol_snippets.as_deref(),
            input_preview: &item.input_preview,
            input_text: item.input_text.as_deref(),
        }
    }
}

/// Response body from `GET /history`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryPage {
    #[serde(default)]
    pub items: Vec<DiagnosisResult>,
}

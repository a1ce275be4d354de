//! Backend diagnosis list → displayable outcome.
//!
//! List order is relevance rank: the first candidate is the primary
//! diagnosis, the rest are differentials in the order received.

use crate::models::{BackendDiagnosisResponse, DiagnosisOutcome, DifferentialDiagnosis};

use super::protocol::protocol_lookup_url;

/// Primary label when the backend found nothing.
pub const UNDETERMINED_DIAGNOSIS: &str = "Диагноз не определён";

/// ICD-10 placeholder when the backend found nothing.
pub const MISSING_ICD10: &str = "—";

pub fn outcome_from_response(response: BackendDiagnosisResponse) -> DiagnosisOutcome {
    let raw_protocol_snippets: Vec<String> = response
        .diagnoses
        .iter()
        .map(|d| d.explanation.clone())
        .filter(|e| !e.trim().is_empty())
        .collect();

    let mut items = response.diagnoses.into_iter();
    let primary = items.next();

    let primary_diagnosis = primary
        .as_ref()
        .map(|p| p.diagnosis.trim())
        .filter(|d| !d.is_empty())
        .unwrap_or(UNDETERMINED_DIAGNOSIS)
        .to_string();

    let icd10_code = primary
        .as_ref()
        .map(|p| p.icd10_code.trim())
        .filter(|c| !c.is_empty())
        .unwrap_or(MISSING_ICD10)
        .to_string();

    let supplied_link = primary
        .as_ref()
        .and_then(|p| p.medelement_url.as_deref())
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string);

    let protocol_reference = supplied_link.or_else(|| {
        (icd10_code != MISSING_ICD10).then(|| protocol_lookup_url(&icd10_code))
    });

    let differential_diagnoses = items
        .map(|d| DifferentialDiagnosis {
            diagnosis: d.diagnosis,
            icd10_code: d.icd10_code,
            reasoning: d.explanation,
        })
        .collect();

    DiagnosisOutcome {
        primary_diagnosis,
        icd10_code,
        confidence_score: None,
        protocol_reference,
        differential_diagnoses,
        raw_protocol_snippets: Some(raw_protocol_snippets),
    }
}

/// Fixed answer used when the backend is unreachable and mock fallback is on.
pub fn demo_outcome() -> DiagnosisOutcome {
    DiagnosisOutcome {
        primary_diagnosis: "Острый аппендицит".to_string(),
        icd10_code: "K35".to_string(),
        confidence_score: Some(0.87),
        protocol_reference: Some(protocol_lookup_url("K35")),
        differential_diagnoses: vec![
            DifferentialDiagnosis {
                diagnosis: "Мезентериальный лимфаденит".to_string(),
                icd10_code: "I88".to_string(),
                reasoning: "Схожая клиника у детей".to_string(),
            },
            DifferentialDiagnosis {
                diagnosis: "Внематочная беременность".to_string(),
                icd10_code: "O00".to_string(),
                reasoning: "Исключить у женщин репродуктивного возраста".to_string(),
            },
        ],
        raw_protocol_snippets: Some(vec![
            "При остром аппендиците показана экстренная аппендэктомия.".to_string(),
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BackendDiagnosisItem;

    fn item(code: &str, diagnosis: &str, explanation: &str) -> BackendDiagnosisItem {
        BackendDiagnosisItem {
            icd10_code: code.into(),
            diagnosis: diagnosis.into(),
            explanation: explanation.into(),
            protocol_id: format!("p-{code}"),
            ..Default::default()
        }
    }

    #[test]
    fn first_is_primary_rest_are_differentials_in_order() {
        let response = BackendDiagnosisResponse {
            diagnoses: vec![
                item("J18", "Пневмония", "хрипы, лихорадка"),
                item("J20", "Острый бронхит", "кашель"),
                item("J06", "ОРВИ", ""),
            ],
        };
        let out = outcome_from_response(response);

        assert_eq!(out.primary_diagnosis, "Пневмония");
        assert_eq!(out.icd10_code, "J18");
        let codes: Vec<&str> = out
            .differential_diagnoses
            .iter()
            .map(|d| d.icd10_code.as_str())
            .collect();
        assert_eq!(codes, vec!["J20", "J06"]);
        assert_eq!(out.differential_diagnoses[0].reasoning, "кашель");
        assert_eq!(
            out.raw_protocol_snippets,
            Some(vec!["хрипы, лихорадка".to_string(), "кашель".to_string()])
        );
        assert_eq!(out.confidence_score, None);
    }

    #[test]
    fn empty_list_uses_placeholders_and_no_link() {
        let out = outcome_from_response(BackendDiagnosisResponse::default());
        assert_eq!(out.primary_diagnosis, UNDETERMINED_DIAGNOSIS);
        assert_eq!(out.icd10_code, MISSING_ICD10);
        assert!(out.differential_diagnoses.is_empty());
        assert_eq!(out.protocol_reference, None);
    }

    #[test]
    fn blank_primary_fields_use_placeholders() {
        let out = outcome_from_response(BackendDiagnosisResponse {
            diagnoses: vec![item(" ", "", "")],
        });
        assert_eq!(out.primary_diagnosis, UNDETERMINED_DIAGNOSIS);
        assert_eq!(out.icd10_code, MISSING_ICD10);
        assert_eq!(out.protocol_reference, None);
    }

    #[test]
    fn supplied_link_preferred_over_derived() {
        let mut primary = item("K35", "Острый аппендицит", "");
        primary.medelement_url = Some("https://diseases.medelement.com/disease/123".into());
        let out = outcome_from_response(BackendDiagnosisResponse {
            diagnoses: vec![primary],
        });
        assert_eq!(
            out.protocol_reference.as_deref(),
            Some("https://diseases.medelement.com/disease/123")
        );
    }

    #[test]
    fn empty_supplied_link_falls_back_to_lookup() {
        let mut primary = item("K35", "Острый аппендицит", "");
        primary.medelement_url = Some(String::new());
        let out = outcome_from_response(BackendDiagnosisResponse {
            diagnoses: vec![primary],
        });
        assert_eq!(out.protocol_reference, Some(protocol_lookup_url("K35")));
    }

    #[test]
    fn demo_outcome_is_appendicitis() {
        let demo = demo_outcome();
        assert_eq!(demo.icd10_code, "K35");
        assert_eq!(demo.differential_diagnoses.len(), 2);
        assert_eq!(demo.confidence_score, Some(0.87));
    }
}

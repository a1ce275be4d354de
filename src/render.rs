//! Plain-text views for the terminal.
//!
//! Pure functions of the model types, so the CLI and tests share them.

use std::fmt::Write;

use chrono::{DateTime, Local};

use crate::client::{protocol_lookup_url, MISSING_ICD10};
use crate::models::{DiagnosisResult, HealthState, HealthStatus};

/// Link shown for a result: its own reference, else a lookup by ICD-10 code.
pub fn protocol_link(result: &DiagnosisResult) -> Option<String> {
    if let Some(reference) = result.protocol_reference.as_deref().filter(|r| !r.is_empty()) {
        return Some(reference.to_string());
    }
    let code = result.icd10_code.trim();
    if code.is_empty() || code == MISSING_ICD10 {
        return None;
    }
    Some(protocol_lookup_url(code))
}

pub fn render_result(result: &DiagnosisResult) -> String {
    let mut out = String::new();

    // Writing into a String cannot fail.
    let _ = writeln!(out, "Основной диагноз");
    let _ = writeln!(out, "  {} [{}]", result.primary_diagnosis, result.icd10_code);
    if let Some(score) = result.confidence_score {
        let _ = writeln!(out, "  Уверенность: {}%", (score * 100.0).round());
    }
    if let Some(link) = protocol_link(result) {
        let _ = writeln!(out, "  Протокол: {link}");
    }

    if !result.differential_diagnoses.is_empty() {
        let _ = writeln!(out, "\nДифференциальные диагнозы");
        for (i, d) in result.differential_diagnoses.iter().enumerate() {
            let _ = writeln!(out, "  {}. {} [{}]", i + 1, d.diagnosis, d.icd10_code);
            if !d.reasoning.is_empty() {
                let _ = writeln!(out, "     {}", d.reasoning);
            }
        }
    }

    if let Some(snippets) = result.raw_protocol_snippets.as_ref().filter(|s| !s.is_empty()) {
        let _ = writeln!(out, "\nФрагменты протоколов");
        for snippet in snippets {
            let _ = writeln!(out, "  - {snippet}");
        }
    }

    out
}

fn format_timestamp(millis: i64) -> String {
    match DateTime::from_timestamp_millis(millis) {
        Some(at) => at.with_timezone(&Local).format("%d.%m.%Y %H:%M").to_string(),
        None => "?".to_string(),
    }
}

/// One line per entry, newest first as given.
pub fn render_history(items: &[DiagnosisResult]) -> String {
    if items.is_empty() {
        return "История пуста.\n".to_string();
    }
    let mut out = String::new();
    for item in items {
        let _ = writeln!(
            out,
            "{}  [{}] {}  ({})",
            format_timestamp(item.timestamp),
            item.icd10_code,
            item.primary_diagnosis,
            item.id
        );
        if !item.input_preview.is_empty() {
            let _ = writeln!(out, "    {}", item.input_preview);
        }
    }
    out
}

pub fn health_label(state: HealthState) -> &'static str {
    match state {
        HealthState::Online => "LLM Online",
        HealthState::Degraded => "LLM Degraded",
        HealthState::Offline => "Offline",
    }
}

pub fn render_health(status: &HealthStatus) -> String {
    if status.last_check == 0 {
        return format!("{} (ещё не проверялось)", health_label(status.status));
    }
    format!(
        "{} (проверено {})",
        health_label(status.status),
        format_timestamp(status.last_check)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DiagnosisOutcome, DifferentialDiagnosis};

    fn result(outcome: DiagnosisOutcome) -> DiagnosisResult {
        DiagnosisResult::from_outcome(
            "r1".into(),
            outcome,
            1_700_000_000_000,
            "боль в животе".into(),
            None,
        )
    }

    #[test]
    fn result_shows_badge_confidence_and_link() {
        let text = render_result(&result(DiagnosisOutcome {
            primary_diagnosis: "Острый аппендицит".into(),
            icd10_code: "K35".into(),
            confidence_score: Some(0.87),
            ..Default::default()
        }));

        assert!(text.contains("Острый аппендицит [K35]"));
        assert!(text.contains("Уверенность: 87%"));
        assert!(text.contains(&protocol_lookup_url("K35")));
        assert!(!text.contains("Дифференциальные"));
    }

    #[test]
    fn explicit_reference_wins_over_lookup() {
        let r = result(DiagnosisOutcome {
            icd10_code: "J18".into(),
            protocol_reference: Some("https://diseases.medelement.com/disease/123".into()),
            ..Default::default()
        });
        assert_eq!(
            protocol_link(&r).as_deref(),
            Some("https://diseases.medelement.com/disease/123")
        );
    }

    #[test]
    fn no_link_without_code() {
        let r = result(DiagnosisOutcome {
            primary_diagnosis: "Диагноз не определён".into(),
            icd10_code: MISSING_ICD10.into(),
            ..Default::default()
        });
        assert_eq!(protocol_link(&r), None);
        assert!(!render_result(&r).contains("Протокол"));
    }

    #[test]
    fn differentials_are_numbered_and_snippets_listed() {
        let text = render_result(&result(DiagnosisOutcome {
            primary_diagnosis: "Пневмония".into(),
            icd10_code: "J18".into(),
            differential_diagnoses: vec![
                DifferentialDiagnosis {
                    diagnosis: "Бронхит".into(),
                    icd10_code: "J20".into(),
                    reasoning: "Кашель без очаговых изменений".into(),
                },
                DifferentialDiagnosis {
                    diagnosis: "ОРВИ".into(),
                    icd10_code: "J06".into(),
                    reasoning: String::new(),
                },
            ],
            raw_protocol_snippets: Some(vec!["Хрипы в лёгких".into()]),
            ..Default::default()
        }));

        assert!(text.contains("1. Бронхит [J20]"));
        assert!(text.contains("Кашель без очаговых изменений"));
        assert!(text.contains("2. ОРВИ [J06]"));
        assert!(text.contains("  - Хрипы в лёгких"));
    }

    #[test]
    fn history_lines_and_empty_state() {
        assert_eq!(render_history(&[]), "История пуста.\n");

        let text = render_history(&[result(DiagnosisOutcome {
            primary_diagnosis: "Острый аппендицит".into(),
            icd10_code: "K35".into(),
            ..Default::default()
        })]);
        assert!(text.contains("[K35] Острый аппендицит  (r1)"));
        assert!(text.contains("    боль в животе"));
    }

    #[test]
    fn health_labels() {
        assert_eq!(
            render_health(&HealthStatus::default()),
            "Offline (ещё не проверялось)"
        );
        let checked = HealthStatus {
            status: HealthState::Online,
            last_check: 1_700_000_000_000,
        };
        assert!(render_health(&checked).starts_with("LLM Online (проверено "));
    }
}

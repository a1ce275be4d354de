//! Deep links into the public clinical-protocol catalogue (MedElement),
//! used when the backend does not supply its own link.

use reqwest::Url;

pub const PROTOCOL_LOOKUP_BASE: &str = "https://diseases.medelement.com/";

/// Search URL for the protocols filed under an ICD-10 code.
pub fn protocol_lookup_url(icd10_code: &str) -> String {
    let params = [
        ("searched_data", "diseases"),
        ("q", icd10_code.trim()),
        ("diseases_filter_type", "list"),
        ("diseases_content_type", "4"),
    ];
    match Url::parse_with_params(PROTOCOL_LOOKUP_BASE, &params) {
        Ok(url) => url.into(),
        Err(e) => {
            tracing::warn!(error = %e, "cannot build protocol lookup URL");
            PROTOCOL_LOOKUP_BASE.to_string()
        }
    }
}

//! Anamnesis input rules.
//!
//! Input is sanitized as it enters the form, so whatever sits in the
//! diagnosis store can always be submitted: letters (Latin and Cyrillic),
//! digits, whitespace and `.,;:!?-()`, at most `MAX_INPUT_CHARS` chars.

use std::sync::LazyLock;

use regex::Regex;

/// Maximum anamnesis length in characters.
pub const MAX_INPUT_CHARS: usize = 2_000;

/// Characters of the input kept as the history preview.
pub const PREVIEW_CHARS: usize = 100;

/// Punctuation accepted besides letters, digits and whitespace.
pub const ALLOWED_PUNCTUATION: &str = ".,;:!?-()";

/// Shown instead of backend validation errors.
pub const ALLOWED_CHARS_HINT: &str =
    "Не используйте символы °, / и др.: только буквы, цифры и знаки .,;:!?-()";

static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^\x{0400}-\x{04FF}a-zA-Z0-9\s.,;:!?\-()]").expect("valid regex")
});

static INVALID_INPUT_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)invalid|неверн|ошибка ввода|validation|формат").expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InputError {
    #[error("Введите анамнез пациента")]
    Empty,
    #[error("Слишком длинный текст: {len} символов (максимум {max})")]
    TooLong { len: usize, max: usize },
    #[error("Недопустимые символы: {}", .0.iter().collect::<String>())]
    DisallowedCharacters(Vec<char>),
}

/// Strip disallowed characters, then cap the length.
pub fn sanitize_input(raw: &str) -> String {
    let cleaned = DISALLOWED_CHARS.replace_all(raw, "");
    truncate_chars(&cleaned, MAX_INPUT_CHARS).to_string()
}

/// What `sanitize_input` changed in a piece of raw text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Adjustments {
    pub stripped_chars: bool,
    pub truncated: bool,
}

pub fn adjustments(raw: &str) -> Adjustments {
    let cleaned = DISALLOWED_CHARS.replace_all(raw, "");
    Adjustments {
        stripped_chars: cleaned.len() != raw.len(),
        truncated: cleaned.chars().count() > MAX_INPUT_CHARS,
    }
}

/// Check that text can be submitted as-is.
pub fn validate_input(text: &str) -> Result<(), InputError> {
    if text.trim().is_empty() {
        return Err(InputError::Empty);
    }

    let len = text.chars().count();
    if len > MAX_INPUT_CHARS {
        return Err(InputError::TooLong {
            len,
            max: MAX_INPUT_CHARS,
        });
    }

    let mut offending: Vec<char> = DISALLOWED_CHARS
        .find_iter(text)
        .flat_map(|m| m.as_str().chars())
        .collect();
    if !offending.is_empty() {
        offending.dedup();
        return Err(InputError::DisallowedCharacters(offending));
    }

    Ok(())
}

/// First `max` characters of `text`, never splitting a char.
pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// History preview of an anamnesis.
pub fn preview(text: &str) -> String {
    truncate_chars(text, PREVIEW_CHARS).to_string()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Replace backend complaints about input format with the allowed-characters hint.
pub fn rewrite_backend_error(message: &str) -> String {
    if INVALID_INPUT_MESSAGE.is_match(message) {
        ALLOWED_CHARS_HINT.to_string()
    } else {
        message.to_string()
    }
}

//! Internal helpers for model validation and conversion.
//!
//! These utilities are **not** part of the public API. They centralize
//! validation and mapping logic so the engine enforces consistent invariants.

use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};
use uuid::Uuid;

use crate::{EngineError, ResultEngine};

/// Parse a UUID from storage and return a labeled error on failure.
pub(crate) fn parse_uuid(value: &str, label: &str) -> ResultEngine<Uuid> {
    Uuid::parse_str(value).map_err(|_| EngineError::InvalidId(format!("invalid {label} id")))
}

pub(crate) fn parse_optional_uuid(value: Option<&str>, label: &str) -> ResultEngine<Option<Uuid>> {
    value.map(|v| parse_uuid(v, label)).transpose()
}

pub(crate) fn normalize_required_name(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid(label, "must not be empty"));
    }
    Ok(trimmed.to_string())
}

pub(crate) fn normalize_optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// `None` keeps the stored value, `Some("")` clears it.
pub(crate) fn apply_optional_text_patch(
    existing: Option<String>,
    patch: Option<&str>,
) -> Option<String> {
    match patch {
        None => existing,
        Some(value) => normalize_optional_text(Some(value)),
    }
}

/// `None` keeps the stored link, `Some(None)` clears it.
pub(crate) fn apply_optional_id_patch(
    existing: Option<Uuid>,
    patch: Option<Option<Uuid>>,
) -> Option<Uuid> {
    match patch {
        None => existing,
        Some(value) => value,
    }
}

/// Comparison key for names: accents folded, lowercase, separators collapsed.
pub(crate) fn normalize_key(input: &str) -> Option<String> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }

    let mut out = String::new();
    let mut prev_space = false;
    for ch in trimmed.nfkd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch.is_alphanumeric() {
            out.extend(ch.to_lowercase());
            prev_space = false;
        } else if !out.is_empty() && !prev_space {
            out.push(' ');
            prev_space = true;
        }
    }
    let normalized = out.trim_end();
    if normalized.is_empty() {
        None
    } else {
        Some(normalized.to_string())
    }
}

/// Trimmed and lowercased email; rejects values without a single `@`
/// separating a non-empty local part and domain.
pub(crate) fn normalize_email(value: &str) -> ResultEngine<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(EngineError::invalid("email", "invalid email address"));
    }
    Ok(email)
}

pub(crate) fn require_positive(value: i64, field: &str) -> ResultEngine<()> {
    if value <= 0 {
        return Err(EngineError::invalid(field, "must be > 0"));
    }
    Ok(())
}

pub(crate) fn require_non_negative(value: i64, field: &str) -> ResultEngine<()> {
    if value < 0 {
        return Err(EngineError::invalid(field, "must be >= 0"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_key_folds_accents_and_separators() {
        assert_eq!(normalize_key("  Gestión   de_Ventas "), Some("gestion de ventas".to_string()));
        assert_eq!(normalize_key("CAFÉ"), normalize_key("cafe"));
        assert_eq!(normalize_key(" -- "), None);
    }

    #[test]
    fn text_patch_keeps_clears_and_sets() {
        let existing = Some("old".to_string());
        assert_eq!(apply_optional_text_patch(existing.clone(), None), existing);
        assert_eq!(apply_optional_text_patch(existing.clone(), Some("  ")), None);
        assert_eq!(
            apply_optional_text_patch(existing, Some(" new ")),
            Some("new".to_string())
        );
    }

    #[test]
    fn id_patch_keeps_clears_and_sets() {
        let id = Uuid::new_v4();
        assert_eq!(apply_optional_id_patch(Some(id), None), Some(id));
        assert_eq!(apply_optional_id_patch(Some(id), Some(None)), None);
        assert_eq!(apply_optional_id_patch(None, Some(Some(id))), Some(id));
    }

    #[test]
    fn normalize_email_lowercases_and_validates() {
        assert_eq!(
            normalize_email(" Ana@Example.COM ").ok(),
            Some("ana@example.com".to_string())
        );
        assert!(normalize_email("no-at-sign").is_err());
        assert!(normalize_email("@example.com").is_err());
        assert!(normalize_email("a@b@c").is_err());
    }

    #[test]
    fn required_name_rejects_blank() {
        assert_eq!(
            normalize_required_name("   ", "name"),
            Err(EngineError::invalid("name", "must not be empty"))
        );
        assert_eq!(normalize_required_name(" Widget ", "name").ok(), Some("Widget".to_string()));
    }
}

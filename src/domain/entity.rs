//! Domain Layer - Core Entity Trait
//!
//! This trait defines the basic contract for all domain entities.
//! All entities must have a unique ID and be thread-safe.

use serde::{Deserialize, Serialize};

use crate::position::PositionError;

/// Core trait for all domain entities
pub trait Entity: Sized + Send + Sync + Clone {
    /// The type of the entity's unique identifier
    type Id: Copy + Eq + std::hash::Hash + Send + Sync;

    /// Returns the entity's unique identifier
    fn id(&self) -> Self::Id;
}

/// Common result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level errors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum DomainError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Stale version or otherwise concurrent modification
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
    #[error("Invalid ordering: {0}")]
    InvalidOrdering(#[from] PositionError),
}

/// Reduce `value` to plain text and check it holds between 1 and `max` characters
///
/// Markup is removed (entity-encoded markup included) and runs of whitespace
/// collapse to one space.
pub(crate) fn require_text(field: &str, value: &str, max: usize) -> DomainResult<String> {
    let cleaned = plain_text(value);
    if cleaned.is_empty() {
        return Err(DomainError::InvalidInput(format!("{} must not be empty", field)));
    }
    check_len(field, &cleaned, max)?;
    Ok(cleaned)
}

/// Optional image reference: `http(s)` URL with a host, or an inline `data:image/` URI
pub(crate) fn optional_url(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    let Some(value) = optional_text(field, value, max)? else {
        return Ok(None);
    };
    if value.starts_with("data:image/") {
        return Ok(Some(value));
    }

    let parsed = url::Url::parse(&value)
        .map_err(|e| DomainError::InvalidInput(format!("{} is not a valid URL: {}", field, e)))?;
    match parsed.scheme() {
        "http" | "https" if parsed.host().is_some() => Ok(Some(value)),
        scheme => Err(DomainError::InvalidInput(format!(
            "{} must be an http(s) or data:image URL, got {}:",
            field, scheme
        ))),
    }
}

fn plain_text(value: &str) -> String {
    let decoded = html_escape::decode_html_entities(value);
    strip_tags(&decoded).split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop `<tag ...>`, `</tag>` and `<!...>` sequences, keeping their inner text.
/// A `<` that does not open a tag, or is never closed, is kept as is.
fn strip_tags(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;
    while let Some(start) = rest.find('<') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let opens_tag = tail[1..]
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '/' || c == '!');
        match tail.find('>') {
            Some(end) if opens_tag => {
                out.push(' ');
                rest = &tail[end + 1..];
            }
            _ => {
                out.push('<');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Like [`require_text`] but blank input becomes `None`
pub(crate) fn optional_text(field: &str, value: Option<&str>, max: usize) -> DomainResult<Option<String>> {
    match value.map(str::trim) {
        None | Some("") => Ok(None),
        Some(trimmed) => {
            check_len(field, trimmed, max)?;
            Ok(Some(trimmed.to_string()))
        }
    }
}

fn check_len(field: &str, value: &str, max: usize) -> DomainResult<()> {
    let len = value.chars().count();
    if len > max {
        return Err(DomainError::InvalidInput(format!(
            "{} is {} characters, limit is {}",
            field, len, max
        )));
    }
    Ok(())
}

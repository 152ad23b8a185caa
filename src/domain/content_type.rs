//! Content type descriptors.

use serde::{Deserialize, Serialize};

use super::error::DomainError;

const MAX_TYPE_NAME_LEN: usize = 20;

/// A content type whose items can be reordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub name: String,
    pub label: String,
    pub hierarchical: bool,
}

impl ContentType {
    pub fn new(
        name: impl Into<String>,
        label: impl Into<String>,
        hierarchical: bool,
    ) -> Result<Self, DomainError> {
        let name = name.into();
        validate_type_name(&name)?;
        let label = label.into();
        let label = if label.trim().is_empty() {
            name.clone()
        } else {
            label.trim().to_string()
        };

        Ok(Self {
            name,
            label,
            hierarchical,
        })
    }
}

/// Type names are short lowercase keys (`post`, `page`, `case_study`).
pub fn validate_type_name(name: &str) -> Result<(), DomainError> {
    if name.is_empty() {
        return Err(DomainError::validation("content type name cannot be empty"));
    }
    if name.len() > MAX_TYPE_NAME_LEN {
        return Err(DomainError::validation(format!(
            "content type name `{name}` exceeds {MAX_TYPE_NAME_LEN} characters"
        )));
    }
    if !name
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '_' || ch == '-')
    {
        return Err(DomainError::validation(format!(
            "content type name `{name}` may only contain a-z, 0-9, `_` and `-`"
        )));
    }
    Ok(())
}

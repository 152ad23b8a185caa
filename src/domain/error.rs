use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("content type `{name}` is not registered")]
    UnknownType { name: String },
    #[error("domain validation failed: {message}")]
    Validation { message: String },
    #[error("hierarchy invariant violated: {message}")]
    Hierarchy { message: String },
}

impl DomainError {
    pub fn unknown_type(name: impl Into<String>) -> Self {
        Self::UnknownType { name: name.into() }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn hierarchy(message: impl Into<String>) -> Self {
        Self::Hierarchy {
            message: message.into(),
        }
    }
}

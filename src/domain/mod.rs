//! Domain layer types and invariants.

pub mod content_type;
pub mod entities;
pub mod error;
pub mod types;

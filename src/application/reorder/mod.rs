//! The incremental renumbering protocol: engine, intent derivation and the
//! client-side batch driver.

mod batch;
mod driver;
mod engine;
mod intent;

pub use batch::{BatchOutcome, MovedItem, PassState, RenumberBatchRequest, RenumberBatchResponse};
pub use driver::{
    BatchDriver, BatchTransport, DriveReport, DriverStatus, RetryPolicy, TransportError,
};
pub use engine::ReorderEngine;
pub use intent::{ListEntry, ListSnapshot, ReorderIntent};

use std::sync::Arc;

use thiserror::Error;

use crate::application::registry::ReorderRegistry;
use crate::application::repos::RepoError;
use crate::application::settings::{ReorderSettingsService, SettingsError};

#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("malformed reorder request: {0}")]
    Malformed(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}

impl ReorderError {
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed(message.into())
    }
}

/// Resolves the type configuration for a batch and hands it to the engine.
#[derive(Clone)]
pub struct ReorderService {
    engine: ReorderEngine,
    registry: Arc<ReorderRegistry>,
    settings: Arc<ReorderSettingsService>,
}

impl ReorderService {
    pub fn new(
        engine: ReorderEngine,
        registry: Arc<ReorderRegistry>,
        settings: Arc<ReorderSettingsService>,
    ) -> Self {
        Self {
            engine,
            registry,
            settings,
        }
    }

    /// Run one batch for a registered, enabled type.
    pub async fn run_batch(
        &self,
        request: RenumberBatchRequest,
    ) -> Result<BatchOutcome, ReorderError> {
        let config = self
            .registry
            .get(&request.item_type)
            .ok_or_else(|| {
                ReorderError::malformed(format!("unknown content type `{}`", request.item_type))
            })?;

        if !self.settings.is_enabled(config.name()).await? {
            return Err(ReorderError::malformed(format!(
                "reordering is disabled for `{}`",
                config.name()
            )));
        }

        self.engine.run_batch(config, request).await
    }
}

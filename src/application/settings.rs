use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use crate::application::registry::ReorderRegistry;
use crate::application::repos::{OptionsRepo, RepoError};
use crate::domain::entities::{ReorderSettingsRecord, TypeOrdering};
use crate::domain::types::{OrderBy, SortDirection, Toggle};

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("content type `{0}` is not registered")]
    UnknownType(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Submitted values for one content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSettingsInput {
    pub item_type: String,
    pub enabled: bool,
    pub orderby: OrderBy,
    pub order: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateReorderSettingsCommand {
    pub types: Vec<TypeSettingsInput>,
}

#[derive(Clone)]
pub struct ReorderSettingsService {
    repo: Arc<dyn OptionsRepo>,
    registry: Arc<ReorderRegistry>,
}

impl ReorderSettingsService {
    pub fn new(repo: Arc<dyn OptionsRepo>, registry: Arc<ReorderRegistry>) -> Self {
        Self { repo, registry }
    }

    pub async fn load(&self) -> Result<ReorderSettingsRecord, SettingsError> {
        self.repo
            .load_reorder_settings()
            .await
            .map_err(SettingsError::from)
    }

    /// Merge the submitted values into the stored blob.
    ///
    /// Types that are not submitted keep their stored values.
    pub async fn update(
        &self,
        actor: &str,
        command: UpdateReorderSettingsCommand,
    ) -> Result<ReorderSettingsRecord, SettingsError> {
        if let Some(unknown) = command
            .types
            .iter()
            .find(|input| self.registry.get(&input.item_type).is_none())
        {
            return Err(SettingsError::UnknownType(unknown.item_type.clone()));
        }

        let mut record = self.repo.load_reorder_settings().await?;
        for input in command.types {
            record
                .post_types
                .insert(input.item_type.clone(), Toggle::from_bool(input.enabled));
            record.menu_order.insert(
                input.item_type,
                TypeOrdering {
                    orderby: input.orderby,
                    order: input.order,
                },
            );
        }

        self.repo.save_reorder_settings(&record).await?;
        info!(
            target: "reorder_posts::application::settings",
            actor,
            types = record.post_types.len(),
            "reorder settings updated"
        );
        Ok(record)
    }

    pub async fn is_enabled(&self, item_type: &str) -> Result<bool, SettingsError> {
        Ok(self.load().await?.is_enabled(item_type))
    }

    pub async fn ordering_for(&self, item_type: &str) -> Result<TypeOrdering, SettingsError> {
        Ok(self.load().await?.ordering_for(item_type))
    }

    pub fn registry(&self) -> &ReorderRegistry {
        &self.registry
    }
}

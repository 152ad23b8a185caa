//! Front-end listings that honour the stored ordinals when configured to.

use std::sync::Arc;

use reorder_api_types::{PublicItem, PublicListing};
use thiserror::Error;
use tracing::debug;

use crate::application::registry::ReorderRegistry;
use crate::application::repos::{PublicItemsRepo, PublicOrder, RepoError};
use crate::application::settings::{ReorderSettingsService, SettingsError};
use crate::domain::error::DomainError;
use crate::domain::types::{ItemStatus, OrderBy};

pub const DEFAULT_PUBLIC_LIMIT: u32 = 100;
pub const MAX_PUBLIC_LIMIT: u32 = 500;

#[derive(Debug, Error)]
pub enum PublicListingError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Clone)]
pub struct PublicListingService {
    items: Arc<dyn PublicItemsRepo>,
    registry: Arc<ReorderRegistry>,
    settings: Arc<ReorderSettingsService>,
}

impl PublicListingService {
    pub fn new(
        items: Arc<dyn PublicItemsRepo>,
        registry: Arc<ReorderRegistry>,
        settings: Arc<ReorderSettingsService>,
    ) -> Self {
        Self {
            items,
            registry,
            settings,
        }
    }

    /// Ordering applied to public listings of `item_type`.
    pub async fn order_for(&self, item_type: &str) -> Result<PublicOrder, PublicListingError> {
        let ordering = self.settings.ordering_for(item_type).await?;
        let extensions = self.registry.extensions();

        let applies = ordering.orderby == OrderBy::MenuOrder
            && extensions.order_override_enabled()
            && !extensions.suppresses_order_override(item_type);

        Ok(if applies {
            PublicOrder::Ordinal(ordering.order)
        } else {
            PublicOrder::Date
        })
    }

    pub async fn list(
        &self,
        item_type: &str,
        limit: Option<u32>,
    ) -> Result<PublicListing, PublicListingError> {
        self.registry.require(item_type)?;
        let order = self.order_for(item_type).await?;
        let limit = limit
            .unwrap_or(DEFAULT_PUBLIC_LIMIT)
            .clamp(1, MAX_PUBLIC_LIMIT);

        let records = self
            .items
            .list_public(item_type, ItemStatus::Publish, order, limit)
            .await?;
        debug!(item_type, ?order, count = records.len(), "public listing");

        Ok(PublicListing {
            item_type: item_type.to_string(),
            ordered_by: match order {
                PublicOrder::Ordinal(_) => "menu_order".to_string(),
                PublicOrder::Date => "date".to_string(),
            },
            items: records
                .into_iter()
                .map(|record| PublicItem {
                    id: record.id,
                    title: record.title,
                    parent_id: record.parent_id,
                    ordinal: record.ordinal,
                })
                .collect(),
        })
    }
}

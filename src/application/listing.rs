//! Builds the item tree shown on a reorder page.

use std::{future::Future, pin::Pin, sync::Arc};

use thiserror::Error;

use crate::application::registry::{ReorderRegistry, TypeConfig};
use crate::application::repos::{GroupPageRequest, RepoError, SiblingQuery};
use crate::application::settings::{ReorderSettingsService, SettingsError};
use crate::domain::entities::{ItemId, ItemRecord, Ordinal, ROOT_PARENT};
use crate::domain::error::DomainError;
use crate::domain::types::SortDirection;

#[derive(Debug, Error)]
pub enum ListingError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("reordering is disabled for `{0}`")]
    Disabled(String),
    #[error("listing offset exceeds the ordinal range")]
    OffsetOverflow,
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingNode {
    pub item: ItemRecord,
    pub children: Vec<ListingNode>,
}

#[derive(Debug, Clone)]
pub struct ListingPage {
    pub config: TypeConfig,
    pub nodes: Vec<ListingNode>,
    /// 1-based page number after clamping.
    pub page: u32,
    pub page_count: u32,
    /// Ordinal of the first root node on this page.
    pub base_offset: Ordinal,
    pub total_items: u64,
    pub large_list: bool,
}

impl ListingPage {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

/// Number of overlapping root pages needed to show `total` items.
pub fn page_count(total: u64, page_size: u32, page_stride: u32) -> u32 {
    let size = u64::from(page_size.max(1));
    let stride = u64::from(page_stride.max(1));
    if total <= size {
        return 1;
    }
    let extra = (total - size).div_ceil(stride);
    u32::try_from(1 + extra).unwrap_or(u32::MAX)
}

/// Offset of the first root item on 1-based `page`.
pub fn page_offset(page: u32, page_stride: u32) -> u64 {
    u64::from(page_stride) * u64::from(page.saturating_sub(1))
}

type ChildrenFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<ListingNode>, ListingError>> + Send + 'a>>;

#[derive(Clone)]
pub struct ListingService {
    siblings: Arc<dyn SiblingQuery>,
    registry: Arc<ReorderRegistry>,
    settings: Arc<ReorderSettingsService>,
}

impl ListingService {
    pub fn new(
        siblings: Arc<dyn SiblingQuery>,
        registry: Arc<ReorderRegistry>,
        settings: Arc<ReorderSettingsService>,
    ) -> Self {
        Self {
            siblings,
            registry,
            settings,
        }
    }

    pub async fn page(&self, item_type: &str, page: u32) -> Result<ListingPage, ListingError> {
        let config = self.registry.require(item_type)?.clone();
        if !self.settings.is_enabled(config.name()).await? {
            return Err(ListingError::Disabled(config.name().to_string()));
        }

        let root_total = self
            .siblings
            .count_siblings(config.name(), ROOT_PARENT, config.status)
            .await?;
        let page_count = page_count(root_total, config.page_size, config.page_stride);
        let page = page.clamp(1, page_count);
        let offset = page_offset(page, config.page_stride);
        let base_offset = Ordinal::try_from(offset).map_err(|_| ListingError::OffsetOverflow)?;

        let roots = self
            .siblings
            .list_page(GroupPageRequest {
                item_type: config.name(),
                parent_id: ROOT_PARENT,
                status: config.status,
                offset,
                limit: config.page_size,
                direction: SortDirection::Asc,
            })
            .await?;

        let mut nodes = Vec::with_capacity(roots.len());
        for item in roots {
            let children = if config.hierarchical() && config.max_depth > 1 {
                self.children(&config, item.id, 2).await?
            } else {
                Vec::new()
            };
            nodes.push(ListingNode { item, children });
        }

        let total_items = self
            .siblings
            .count_items(config.name(), config.status)
            .await?;

        Ok(ListingPage {
            large_list: total_items >= config.large_list_threshold,
            config,
            nodes,
            page,
            page_count,
            base_offset,
            total_items,
        })
    }

    fn children<'a>(
        &'a self,
        config: &'a TypeConfig,
        parent_id: ItemId,
        depth: u32,
    ) -> ChildrenFuture<'a> {
        Box::pin(async move {
            let items = self
                .siblings
                .list_page(GroupPageRequest {
                    item_type: config.name(),
                    parent_id,
                    status: config.status,
                    offset: 0,
                    limit: config.child_cap,
                    direction: SortDirection::Asc,
                })
                .await?;

            let mut nodes = Vec::with_capacity(items.len());
            for item in items {
                let children = if depth < config.max_depth {
                    self.children(config, item.id, depth + 1).await?
                } else {
                    Vec::new()
                };
                nodes.push(ListingNode { item, children });
            }
            Ok(nodes)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_page_until_page_size_is_exceeded() {
        assert_eq!(page_count(0, 50, 48), 1);
        assert_eq!(page_count(50, 50, 48), 1);
        assert_eq!(page_count(51, 50, 48), 2);
    }

    #[test]
    fn overlapping_pages_follow_stride() {
        assert_eq!(page_count(98, 50, 48), 2);
        assert_eq!(page_count(99, 50, 48), 3);
        assert_eq!(page_count(120, 50, 48), 3);
        assert_eq!(page_offset(1, 48), 0);
        assert_eq!(page_offset(2, 48), 48);
        assert_eq!(page_offset(3, 48), 96);
    }

    #[test]
    fn last_page_reaches_final_item() {
        for total in 51..400u64 {
            let pages = page_count(total, 50, 48);
            let last_offset = page_offset(pages, 48);
            assert!(last_offset < total, "total {total}");
            assert!(last_offset + 50 >= total, "total {total}");
        }
    }
}

//! Repository traits describing persistence adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::entities::{ItemId, ItemRecord, Ordinal, ReorderSettingsRecord};
use crate::domain::types::{ItemStatus, SortDirection};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("integrity error: {message}")]
    Integrity { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// Parameters of a sibling-group read used by the renumbering walk.
#[derive(Debug, Clone)]
pub struct SiblingRequest<'a> {
    pub item_type: &'a str,
    pub parent_id: ItemId,
    pub status: ItemStatus,
    pub exclude: &'a [ItemId],
    pub limit: u32,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct SiblingPage {
    pub items: Vec<ItemRecord>,
    pub has_more: bool,
}

/// Offset-based page of one sibling group, used by the list renderer.
#[derive(Debug, Clone)]
pub struct GroupPageRequest<'a> {
    pub item_type: &'a str,
    pub parent_id: ItemId,
    pub status: ItemStatus,
    pub offset: u64,
    pub limit: u32,
    pub direction: SortDirection,
}

/// Ordering applied to front-end listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicOrder {
    /// `ORDER BY ordinal {direction}, title {direction}`.
    Ordinal(SortDirection),
    /// Newest first.
    Date,
}

#[async_trait]
pub trait OrdinalStore: Send + Sync {
    /// Persist a position. Returns [`RepoError::NotFound`] when the item is gone.
    async fn set_ordinal(
        &self,
        item_id: ItemId,
        ordinal: Ordinal,
        parent_id: ItemId,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SiblingQuery: Send + Sync {
    /// Siblings ordered by `(ordinal, title, id)` in `request.direction`,
    /// skipping `request.exclude`.
    async fn list_siblings(&self, request: SiblingRequest<'_>) -> Result<SiblingPage, RepoError>;

    /// Page of a sibling group by offset, ordered like [`Self::list_siblings`].
    async fn list_page(
        &self,
        request: GroupPageRequest<'_>,
    ) -> Result<Vec<ItemRecord>, RepoError>;

    async fn count_siblings(
        &self,
        item_type: &str,
        parent_id: ItemId,
        status: ItemStatus,
    ) -> Result<u64, RepoError>;

    async fn count_items(&self, item_type: &str, status: ItemStatus) -> Result<u64, RepoError>;

    async fn find_item(&self, item_id: ItemId) -> Result<Option<ItemRecord>, RepoError>;
}

#[async_trait]
pub trait PublicItemsRepo: Send + Sync {
    async fn list_public(
        &self,
        item_type: &str,
        status: ItemStatus,
        order: PublicOrder,
        limit: u32,
    ) -> Result<Vec<ItemRecord>, RepoError>;
}

#[async_trait]
pub trait OptionsRepo: Send + Sync {
    /// Load the settings blob; an absent row yields the defaults.
    async fn load_reorder_settings(&self) -> Result<ReorderSettingsRecord, RepoError>;

    async fn save_reorder_settings(&self, settings: &ReorderSettingsRecord)
    -> Result<(), RepoError>;
}

#[async_trait]
pub trait HealthRepo: Send + Sync {
    async fn health_check(&self) -> Result<(), RepoError>;
}

//! In-process repository implementing the same traits as the Postgres one.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    sync::atomic::{AtomicU64, Ordering as AtomicOrdering},
};

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::application::repos::{
    GroupPageRequest, HealthRepo, OptionsRepo, OrdinalStore, PublicItemsRepo, PublicOrder,
    RepoError, SiblingPage, SiblingQuery, SiblingRequest,
};
use crate::domain::entities::{ItemId, ItemRecord, Ordinal, ReorderSettingsRecord};
use crate::domain::types::{ItemStatus, SortDirection};

#[derive(Default)]
struct State {
    items: BTreeMap<ItemId, ItemRecord>,
    settings: Option<ReorderSettingsRecord>,
    next_id: ItemId,
    vanish_on_write: BTreeSet<ItemId>,
}

#[derive(Default)]
pub struct InMemoryRepositories {
    state: RwLock<State>,
    writes: AtomicU64,
}

impl InMemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item and return its id.
    pub async fn insert(
        &self,
        item_type: &str,
        parent_id: ItemId,
        ordinal: Ordinal,
        title: impl Into<String>,
    ) -> ItemId {
        let mut state = self.state.write().await;
        state.next_id += 1;
        let id = state.next_id;
        let now = OffsetDateTime::now_utc();
        state.items.insert(
            id,
            ItemRecord {
                id,
                item_type: item_type.to_string(),
                parent_id,
                ordinal,
                title: title.into(),
                status: ItemStatus::Publish,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub async fn put(&self, record: ItemRecord) {
        let mut state = self.state.write().await;
        state.next_id = state.next_id.max(record.id);
        state.items.insert(record.id, record);
    }

    pub async fn remove(&self, id: ItemId) -> Option<ItemRecord> {
        self.state.write().await.items.remove(&id)
    }

    pub async fn get(&self, id: ItemId) -> Option<ItemRecord> {
        self.state.read().await.items.get(&id).cloned()
    }

    /// Delete `id` the next time it is written, as a concurrent delete would.
    pub async fn vanish_on_write(&self, id: ItemId) {
        self.state.write().await.vanish_on_write.insert(id);
    }

    /// Ids of a sibling group in ascending `(ordinal, title, id)` order.
    pub async fn group(&self, item_type: &str, parent_id: ItemId) -> Vec<ItemRecord> {
        let state = self.state.read().await;
        let mut items: Vec<ItemRecord> = state
            .items
            .values()
            .filter(|item| item.item_type == item_type && item.parent_id == parent_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| sibling_order(a, b, SortDirection::Asc));
        items
    }

    /// Number of successful `set_ordinal` calls so far.
    pub fn write_count(&self) -> u64 {
        self.writes.load(AtomicOrdering::Relaxed)
    }

    fn sorted_group(
        state: &State,
        item_type: &str,
        parent_id: ItemId,
        status: ItemStatus,
        direction: SortDirection,
    ) -> Vec<ItemRecord> {
        let mut items: Vec<ItemRecord> = state
            .items
            .values()
            .filter(|item| {
                item.item_type == item_type && item.parent_id == parent_id && item.status == status
            })
            .cloned()
            .collect();
        items.sort_by(|a, b| sibling_order(a, b, direction));
        items
    }
}

fn sibling_order(a: &ItemRecord, b: &ItemRecord, direction: SortDirection) -> Ordering {
    let ordering = a
        .ordinal
        .cmp(&b.ordinal)
        .then_with(|| a.title.cmp(&b.title))
        .then_with(|| a.id.cmp(&b.id));
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

#[async_trait]
impl OrdinalStore for InMemoryRepositories {
    async fn set_ordinal(
        &self,
        item_id: ItemId,
        ordinal: Ordinal,
        parent_id: ItemId,
    ) -> Result<(), RepoError> {
        let mut state = self.state.write().await;
        if state.vanish_on_write.remove(&item_id) {
            state.items.remove(&item_id);
        }
        let item = state.items.get_mut(&item_id).ok_or(RepoError::NotFound)?;
        item.ordinal = ordinal;
        item.parent_id = parent_id;
        item.updated_at = OffsetDateTime::now_utc();
        self.writes.fetch_add(1, AtomicOrdering::Relaxed);
        Ok(())
    }
}

#[async_trait]
impl SiblingQuery for InMemoryRepositories {
    async fn list_siblings(&self, request: SiblingRequest<'_>) -> Result<SiblingPage, RepoError> {
        let state = self.state.read().await;
        let limit = request.limit as usize;
        let mut items: Vec<ItemRecord> = Self::sorted_group(
            &state,
            request.item_type,
            request.parent_id,
            request.status,
            request.direction,
        )
        .into_iter()
        .filter(|item| !request.exclude.contains(&item.id))
        .take(limit + 1)
        .collect();

        let has_more = items.len() > limit;
        items.truncate(limit);
        Ok(SiblingPage { items, has_more })
    }

    async fn list_page(
        &self,
        request: GroupPageRequest<'_>,
    ) -> Result<Vec<ItemRecord>, RepoError> {
        let state = self.state.read().await;
        let offset = usize::try_from(request.offset)
            .map_err(|_| RepoError::InvalidInput {
                message: "offset out of range".to_string(),
            })?;
        Ok(Self::sorted_group(
            &state,
            request.item_type,
            request.parent_id,
            request.status,
            request.direction,
        )
        .into_iter()
        .skip(offset)
        .take(request.limit as usize)
        .collect())
    }

    async fn count_siblings(
        &self,
        item_type: &str,
        parent_id: ItemId,
        status: ItemStatus,
    ) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .items
            .values()
            .filter(|item| {
                item.item_type == item_type && item.parent_id == parent_id && item.status == status
            })
            .count();
        Ok(count as u64)
    }

    async fn count_items(&self, item_type: &str, status: ItemStatus) -> Result<u64, RepoError> {
        let state = self.state.read().await;
        let count = state
            .items
            .values()
            .filter(|item| item.item_type == item_type && item.status == status)
            .count();
        Ok(count as u64)
    }

    async fn find_item(&self, item_id: ItemId) -> Result<Option<ItemRecord>, RepoError> {
        Ok(self.state.read().await.items.get(&item_id).cloned())
    }
}

#[async_trait]
impl PublicItemsRepo for InMemoryRepositories {
    async fn list_public(
        &self,
        item_type: &str,
        status: ItemStatus,
        order: PublicOrder,
        limit: u32,
    ) -> Result<Vec<ItemRecord>, RepoError> {
        let state = self.state.read().await;
        let mut items: Vec<ItemRecord> = state
            .items
            .values()
            .filter(|item| item.item_type == item_type && item.status == status)
            .cloned()
            .collect();

        match order {
            PublicOrder::Ordinal(direction) => items.sort_by(|a, b| {
                let ordering = a.ordinal.cmp(&b.ordinal).then_with(|| a.title.cmp(&b.title));
                match direction {
                    SortDirection::Asc => ordering,
                    SortDirection::Desc => ordering.reverse(),
                }
            }),
            PublicOrder::Date => items.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| b.id.cmp(&a.id))
            }),
        }
        items.truncate(limit as usize);
        Ok(items)
    }
}

#[async_trait]
impl OptionsRepo for InMemoryRepositories {
    async fn load_reorder_settings(&self) -> Result<ReorderSettingsRecord, RepoError> {
        Ok(self.state.read().await.settings.clone().unwrap_or_default())
    }

    async fn save_reorder_settings(
        &self,
        settings: &ReorderSettingsRecord,
    ) -> Result<(), RepoError> {
        self.state.write().await.settings = Some(settings.clone());
        Ok(())
    }
}

#[async_trait]
impl HealthRepo for InMemoryRepositories {
    async fn health_check(&self) -> Result<(), RepoError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn siblings_report_has_more_from_extra_row() {
        let repo = InMemoryRepositories::new();
        for ordinal in 0..3 {
            repo.insert("post", 0, ordinal, format!("p{ordinal}")).await;
        }

        let page = repo
            .list_siblings(SiblingRequest {
                item_type: "post",
                parent_id: 0,
                status: ItemStatus::Publish,
                exclude: &[],
                limit: 2,
                direction: SortDirection::Asc,
            })
            .await
            .expect("list");
        assert_eq!(page.items.len(), 2);
        assert!(page.has_more);

        let page = repo
            .list_siblings(SiblingRequest {
                item_type: "post",
                parent_id: 0,
                status: ItemStatus::Publish,
                exclude: &[1],
                limit: 2,
                direction: SortDirection::Asc,
            })
            .await
            .expect("list");
        assert_eq!(page.items.len(), 2);
        assert!(!page.has_more);
    }

    #[tokio::test]
    async fn equal_ordinals_tie_break_on_title() {
        let repo = InMemoryRepositories::new();
        let b = repo.insert("page", 0, 0, "beta").await;
        let a = repo.insert("page", 0, 0, "alpha").await;
        let ids: Vec<ItemId> = repo.group("page", 0).await.iter().map(|i| i.id).collect();
        assert_eq!(ids, vec![a, b]);
    }

    #[tokio::test]
    async fn vanished_rows_report_not_found() {
        let repo = InMemoryRepositories::new();
        let id = repo.insert("post", 0, 0, "gone").await;
        repo.vanish_on_write(id).await;
        assert!(matches!(
            repo.set_ordinal(id, 3, 0).await,
            Err(RepoError::NotFound)
        ));
        assert!(repo.get(id).await.is_none());
        assert_eq!(repo.write_count(), 0);
    }
}

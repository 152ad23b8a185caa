//! Server side of the renumbering protocol.

use std::{collections::HashSet, sync::Arc, time::Instant};

use metrics::{counter, histogram};
use tracing::{debug, instrument, warn};

use crate::application::registry::TypeConfig;
use crate::application::repos::{OrdinalStore, RepoError, SiblingQuery, SiblingRequest};
use crate::domain::entities::{ItemId, Ordinal, ROOT_PARENT};
use crate::domain::types::SortDirection;

use super::batch::{BatchOutcome, MovedItem, RenumberBatchRequest, RenumberBatchResponse};
use super::ReorderError;

pub(crate) const METRIC_BATCHES: &str = "reorder_batches_total";
pub(crate) const METRIC_ROWS_WRITTEN: &str = "reorder_rows_written_total";
pub(crate) const METRIC_ROWS_SKIPPED: &str = "reorder_rows_skipped_total";
pub(crate) const METRIC_BATCH_MS: &str = "reorder_batch_ms";

/// Renumbers one sibling group a batch at a time.
#[derive(Clone)]
pub struct ReorderEngine {
    store: Arc<dyn OrdinalStore>,
    siblings: Arc<dyn SiblingQuery>,
}

#[derive(Default)]
struct Tally {
    written: u32,
    unchanged: u32,
    missing: u32,
}

impl ReorderEngine {
    pub fn new(store: Arc<dyn OrdinalStore>, siblings: Arc<dyn SiblingQuery>) -> Self {
        Self { store, siblings }
    }

    /// Run one batch of a pass.
    ///
    /// The moved item is written on the first batch of the pass (when it is
    /// not yet excluded) and its target ordinal is kept free while the
    /// remaining siblings are assigned consecutive ordinals from
    /// `start_offset`. At most `batch_size` rows are written per call.
    #[instrument(
        skip(self, config, request),
        fields(
            item_type = %config.name(),
            parent_id = request.parent_id,
            start = request.start_offset,
            excluded = request.excluded.len()
        )
    )]
    pub async fn run_batch(
        &self,
        config: &TypeConfig,
        request: RenumberBatchRequest,
    ) -> Result<BatchOutcome, ReorderError> {
        let started_at = Instant::now();
        validate_request(config, &request)?;

        let RenumberBatchRequest {
            parent_id,
            start_offset,
            mut moved,
            mut excluded,
            ..
        } = request;

        let mut tally = Tally::default();
        let mut budget = config.batch_size;

        if let Some(item) = moved
            && !excluded.contains(&item.id)
        {
            self.check_move(config, item.id, parent_id).await?;
            let placed = self
                .place(item.id, item.ordinal, parent_id, &mut tally)
                .await?;
            excluded.push(item.id);
            budget = budget.saturating_sub(1);
            if !placed {
                // Nothing occupies the target any more, so no slot is held.
                moved = None;
            }
        }

        let page = self
            .siblings
            .list_siblings(SiblingRequest {
                item_type: config.name(),
                parent_id,
                status: config.status,
                exclude: &excluded,
                limit: budget,
                direction: SortDirection::Asc,
            })
            .await?;

        let mut cursor = start_offset;
        for sibling in page.items {
            if moved.is_some_and(|item| item.id == sibling.id) {
                continue;
            }
            if moved.is_some_and(|item| item.ordinal == cursor) {
                cursor = next_ordinal(cursor)?;
            }

            let occupied = if sibling.ordinal == cursor && sibling.parent_id == parent_id {
                tally.unchanged += 1;
                true
            } else {
                self.place(sibling.id, cursor, parent_id, &mut tally).await?
            };
            if occupied {
                cursor = next_ordinal(cursor)?;
            }
            excluded.push(sibling.id);
        }

        if !page.has_more
            && let Some(MovedItem { id, ordinal }) = moved
            && cursor <= ordinal
        {
            // The target lay beyond the group; close the gap.
            let occupied =
                cursor == ordinal || self.place(id, cursor, parent_id, &mut tally).await?;
            if occupied {
                cursor = next_ordinal(cursor)?;
            }
        }

        let item_type = config.name().to_string();
        counter!(METRIC_BATCHES, "type" => item_type.clone()).increment(1);
        counter!(METRIC_ROWS_WRITTEN, "type" => item_type.clone())
            .increment(u64::from(tally.written));
        counter!(METRIC_ROWS_SKIPPED, "type" => item_type)
            .increment(u64::from(tally.unchanged + tally.missing));
        histogram!(METRIC_BATCH_MS).record(started_at.elapsed().as_secs_f64() * 1000.0);

        debug!(
            written = tally.written,
            unchanged = tally.unchanged,
            missing = tally.missing,
            next = cursor,
            has_more = page.has_more,
            "renumber batch complete"
        );

        Ok(BatchOutcome {
            response: RenumberBatchResponse {
                next_start_offset: cursor,
                moved,
                excluded,
                has_more: page.has_more,
            },
            written: tally.written,
            unchanged: tally.unchanged,
            missing: tally.missing,
        })
    }

    /// The moved item and its new parent must both be of the configured type,
    /// and the parent must not sit inside the moved item's own subtree. A moved
    /// item that is already gone is left to the write, which skips it.
    async fn check_move(
        &self,
        config: &TypeConfig,
        moved_id: ItemId,
        parent_id: ItemId,
    ) -> Result<(), ReorderError> {
        if let Some(item) = self.siblings.find_item(moved_id).await?
            && item.item_type != config.name()
        {
            return Err(ReorderError::malformed(format!(
                "item {moved_id} is not a `{}`",
                config.name()
            )));
        }

        let mut current = parent_id;
        let mut seen = HashSet::new();
        while current != ROOT_PARENT {
            if current == moved_id {
                return Err(ReorderError::malformed(
                    "an item cannot be moved under its own descendant",
                ));
            }
            if !seen.insert(current) {
                return Err(ReorderError::malformed(format!(
                    "parent chain of {parent_id} loops"
                )));
            }
            let Some(ancestor) = self.siblings.find_item(current).await? else {
                return Err(ReorderError::malformed(format!(
                    "parent {current} does not exist"
                )));
            };
            if ancestor.item_type != config.name() {
                return Err(ReorderError::malformed(format!(
                    "parent {current} is not a `{}`",
                    config.name()
                )));
            }
            current = ancestor.parent_id;
        }
        Ok(())
    }

    /// Write one position. `Ok(false)` means the row is gone.
    async fn place(
        &self,
        item_id: ItemId,
        ordinal: Ordinal,
        parent_id: ItemId,
        tally: &mut Tally,
    ) -> Result<bool, ReorderError> {
        match self.store.set_ordinal(item_id, ordinal, parent_id).await {
            Ok(()) => {
                tally.written += 1;
                Ok(true)
            }
            Err(RepoError::NotFound) => {
                warn!(
                    target: "reorder_posts::application::reorder",
                    item_id,
                    ordinal,
                    parent_id,
                    "item disappeared during renumber; skipping"
                );
                tally.missing += 1;
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }
}

fn next_ordinal(cursor: Ordinal) -> Result<Ordinal, ReorderError> {
    cursor
        .checked_add(1)
        .ok_or_else(|| ReorderError::malformed("ordinal overflow"))
}

fn validate_request(
    config: &TypeConfig,
    request: &RenumberBatchRequest,
) -> Result<(), ReorderError> {
    if request.parent_id < ROOT_PARENT {
        return Err(ReorderError::malformed("parent id cannot be negative"));
    }
    if request.start_offset < 0 {
        return Err(ReorderError::malformed("start offset cannot be negative"));
    }
    if let Some(moved) = request.moved {
        if moved.id <= 0 {
            return Err(ReorderError::malformed("moved item id must be positive"));
        }
        if moved.ordinal < 0 {
            return Err(ReorderError::malformed("moved item ordinal cannot be negative"));
        }
        if moved.id == request.parent_id {
            return Err(ReorderError::malformed("an item cannot be its own parent"));
        }
    }
    if !config.hierarchical() && request.parent_id != ROOT_PARENT {
        return Err(ReorderError::malformed(format!(
            "`{}` is not hierarchical",
            config.name()
        )));
    }
    Ok(())
}

use crate::domain::entities::{ItemId, Ordinal, ROOT_PARENT};
use crate::domain::error::DomainError;

use super::batch::{MovedItem, RenumberBatchRequest};

/// A rendered list node as the drag-list sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListEntry {
    pub id: ItemId,
    /// Parent recorded on the node when the list was rendered.
    pub parent_id: ItemId,
}

/// The container the item was dropped into, in display order after the drop.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListSnapshot {
    /// Entries of the container, the moved item included. Placeholders are
    /// not entries.
    pub siblings: Vec<ListEntry>,
    /// Node that encloses the container, for nested lists.
    pub enclosing: Option<ItemId>,
    /// Ordinal of the first root entry on the rendered page.
    pub base_offset: Ordinal,
}

/// Where a dropped item should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReorderIntent {
    pub item_id: ItemId,
    pub start_parent: ItemId,
    pub end_parent: ItemId,
    pub end_ordinal: Ordinal,
}

impl ReorderIntent {
    /// Derive the intent from the adjacency of the moved item.
    ///
    /// The new parent is taken from the previous sibling, else the next one,
    /// else the enclosing node, else the root.
    pub fn derive(
        item_id: ItemId,
        start_parent: ItemId,
        snapshot: &ListSnapshot,
    ) -> Result<Self, DomainError> {
        let position = snapshot
            .siblings
            .iter()
            .position(|entry| entry.id == item_id)
            .ok_or_else(|| {
                DomainError::validation(format!("item {item_id} is not in the dropped list"))
            })?;

        let previous = position
            .checked_sub(1)
            .and_then(|index| snapshot.siblings.get(index));
        let next = snapshot.siblings.get(position + 1);

        let end_parent = previous
            .or(next)
            .map(|entry| entry.parent_id)
            .or(snapshot.enclosing)
            .unwrap_or(ROOT_PARENT);

        if end_parent == item_id {
            return Err(DomainError::hierarchy(format!(
                "item {item_id} cannot be nested under itself"
            )));
        }

        let index = Ordinal::try_from(position)
            .map_err(|_| DomainError::validation("list position exceeds ordinal range"))?;
        let offset = if end_parent == ROOT_PARENT {
            snapshot.base_offset
        } else {
            0
        };
        let end_ordinal = index
            .checked_add(offset)
            .ok_or_else(|| DomainError::validation("list position exceeds ordinal range"))?;

        Ok(Self {
            item_id,
            start_parent,
            end_parent,
            end_ordinal,
        })
    }

    pub fn parent_changed(&self) -> bool {
        self.start_parent != self.end_parent
    }

    /// First request of the destination pass.
    pub fn destination_request(&self, item_type: &str) -> RenumberBatchRequest {
        RenumberBatchRequest::start(
            item_type,
            self.end_parent,
            Some(MovedItem {
                id: self.item_id,
                ordinal: self.end_ordinal,
            }),
        )
    }

    /// First request of the source pass, when the item left its group.
    pub fn source_request(&self, item_type: &str) -> Option<RenumberBatchRequest> {
        self.parent_changed()
            .then(|| RenumberBatchRequest::start(item_type, self.start_parent, None))
    }
}

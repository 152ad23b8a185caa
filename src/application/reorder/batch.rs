use crate::domain::entities::{ItemId, Ordinal, ROOT_PARENT};

/// The item the administrator dropped, with its target position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovedItem {
    pub id: ItemId,
    pub ordinal: Ordinal,
}

/// One request of a renumbering pass over a sibling group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberBatchRequest {
    pub item_type: String,
    pub parent_id: ItemId,
    pub start_offset: Ordinal,
    pub moved: Option<MovedItem>,
    pub excluded: Vec<ItemId>,
}

impl RenumberBatchRequest {
    /// First request of a pass.
    pub fn start(
        item_type: impl Into<String>,
        parent_id: ItemId,
        moved: Option<MovedItem>,
    ) -> Self {
        Self {
            item_type: item_type.into(),
            parent_id,
            start_offset: 0,
            moved,
            excluded: Vec::new(),
        }
    }

    /// The request that continues the pass after `response`.
    pub fn continuation(&self, response: &RenumberBatchResponse) -> Self {
        Self {
            item_type: self.item_type.clone(),
            parent_id: self.parent_id,
            start_offset: response.next_start_offset,
            moved: response.moved,
            excluded: response.excluded.clone(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == ROOT_PARENT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenumberBatchResponse {
    pub next_start_offset: Ordinal,
    /// Echoed on the continuation; cleared once the moved item has vanished.
    pub moved: Option<MovedItem>,
    pub excluded: Vec<ItemId>,
    pub has_more: bool,
}

/// Result of one batch as seen by the server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    pub response: RenumberBatchResponse,
    /// Rows whose ordinal or parent changed.
    pub written: u32,
    /// Rows already holding the right position.
    pub unchanged: u32,
    /// Rows that vanished between the read and the write.
    pub missing: u32,
}

/// Progress of one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PassState {
    #[default]
    Started,
    /// `n` batches completed, more to come.
    InProgress(u32),
    Done,
}

impl PassState {
    pub fn advance(self, response: &RenumberBatchResponse) -> Self {
        if !response.has_more {
            return PassState::Done;
        }
        match self {
            PassState::Started => PassState::InProgress(1),
            PassState::InProgress(n) => PassState::InProgress(n.saturating_add(1)),
            PassState::Done => PassState::Done,
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, PassState::Done)
    }
}

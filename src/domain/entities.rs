//! Domain entities mirrored from persistent storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::domain::types::{ItemStatus, OrderBy, SortDirection, Toggle};

pub type ItemId = i64;
pub type Ordinal = i32;

/// Parent id of root-level items.
pub const ROOT_PARENT: ItemId = 0;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub item_type: String,
    pub parent_id: ItemId,
    pub ordinal: Ordinal,
    pub title: String,
    pub status: ItemStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Public ordering preference for one content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TypeOrdering {
    #[serde(default)]
    pub orderby: OrderBy,
    #[serde(default)]
    pub order: SortDirection,
}

/// The persisted settings blob.
///
/// Types absent from `post_types` are enabled; types absent from `menu_order`
/// keep the default public ordering.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReorderSettingsRecord {
    #[serde(default)]
    pub post_types: BTreeMap<String, Toggle>,
    #[serde(default)]
    pub menu_order: BTreeMap<String, TypeOrdering>,
}

impl ReorderSettingsRecord {
    pub fn is_enabled(&self, item_type: &str) -> bool {
        self.post_types
            .get(item_type)
            .copied()
            .is_none_or(Toggle::is_on)
    }

    pub fn ordering_for(&self, item_type: &str) -> TypeOrdering {
        self.menu_order.get(item_type).copied().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_types_default_to_enabled_and_unordered() {
        let record = ReorderSettingsRecord::default();
        assert!(record.is_enabled("page"));
        assert_eq!(record.ordering_for("page"), TypeOrdering::default());
        assert_eq!(record.ordering_for("page").orderby, OrderBy::None);
    }

    #[test]
    fn blob_round_trips_through_json_shape() {
        let json = serde_json::json!({
            "post_types": { "post": "off", "page": "on" },
            "menu_order": { "page": { "orderby": "menu_order", "order": "DESC" } }
        });

        let record: ReorderSettingsRecord = serde_json::from_value(json).expect("valid blob");
        assert!(!record.is_enabled("post"));
        assert!(record.is_enabled("page"));
        assert_eq!(
            record.ordering_for("page"),
            TypeOrdering {
                orderby: OrderBy::MenuOrder,
                order: SortDirection::Desc,
            }
        );
    }
}

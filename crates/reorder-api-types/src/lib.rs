//! Request and response types shared by the reorder batch endpoint, the
//! drag-list clients and the public listing API.

use serde::{Deserialize, Serialize};

/// Action name every batch request must carry.
pub const SORT_ACTION: &str = "post_sort";

/// Form body posted to `/reorder/batch`.
///
/// Field names match the form keys sent by the browser client, including the
/// repeated `excluded[]` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchRequestForm {
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub nonce: String,
    #[serde(default)]
    pub post_parent: Option<i64>,
    #[serde(default)]
    pub start: Option<i32>,
    #[serde(default)]
    pub post_id: Option<i64>,
    #[serde(default)]
    pub menu_order: Option<i32>,
    #[serde(default, rename = "excluded[]")]
    pub excluded: Vec<i64>,
    #[serde(default)]
    pub post_type: Option<String>,
}

impl BatchRequestForm {
    /// Flatten into ordered key/value pairs suitable for
    /// `application/x-www-form-urlencoded` encoding.
    pub fn to_form_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("action", self.action.clone()),
            ("nonce", self.nonce.clone()),
        ];
        if let Some(parent) = self.post_parent {
            pairs.push(("post_parent", parent.to_string()));
        }
        if let Some(start) = self.start {
            pairs.push(("start", start.to_string()));
        }
        if let Some(id) = self.post_id {
            pairs.push(("post_id", id.to_string()));
        }
        if let Some(order) = self.menu_order {
            pairs.push(("menu_order", order.to_string()));
        }
        for id in &self.excluded {
            pairs.push(("excluded[]", id.to_string()));
        }
        if let Some(post_type) = self.post_type.as_ref() {
            pairs.push(("post_type", post_type.clone()));
        }
        pairs
    }
}

/// JSON body returned by `/reorder/batch`.
///
/// `post_id` and `menu_order` echo the moved item (`0` when the pass has no
/// moved item) so the client can send them back on the next continuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchResponseBody {
    pub more_posts: bool,
    pub post_parent: i64,
    pub post_id: i64,
    pub menu_order: i32,
    pub post_type: String,
    pub excluded: Vec<i64>,
    pub start: i32,
}

/// One entry of a public listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicItem {
    pub id: i64,
    pub title: String,
    pub parent_id: i64,
    pub ordinal: i32,
}

/// Public listing of a content type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicListing {
    pub item_type: String,
    /// `"menu_order"` when the ordinal override applied, `"date"` otherwise.
    pub ordered_by: String,
    pub items: Vec<PublicItem>,
}

//! Shared domain enumerations aligned with persisted values.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use super::error::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "item_status", rename_all = "snake_case")]
pub enum ItemStatus {
    Publish,
    Draft,
    Pending,
    Private,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ItemStatus::Publish => "publish",
            ItemStatus::Draft => "draft",
            ItemStatus::Pending => "pending",
            ItemStatus::Private => "private",
        }
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "publish" => Ok(ItemStatus::Publish),
            "draft" => Ok(ItemStatus::Draft),
            "pending" => Ok(ItemStatus::Pending),
            "private" => Ok(ItemStatus::Private),
            other => Err(DomainError::validation(format!(
                "`{other}` is not a known item status"
            ))),
        }
    }
}

/// Sort direction as stored in the settings blob (`"ASC"` / `"DESC"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            other => Err(DomainError::validation(format!(
                "`{other}` is not a sort direction"
            ))),
        }
    }
}

/// Which key public listings of a type are ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderBy {
    #[default]
    None,
    MenuOrder,
}

impl OrderBy {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderBy::None => "none",
            OrderBy::MenuOrder => "menu_order",
        }
    }
}

impl FromStr for OrderBy {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "none" => Ok(OrderBy::None),
            "menu_order" => Ok(OrderBy::MenuOrder),
            other => Err(DomainError::validation(format!(
                "`{other}` is not a supported ordering"
            ))),
        }
    }
}

/// `"on"` / `"off"` switch used by the settings blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Toggle {
    On,
    Off,
}

impl Toggle {
    pub fn from_bool(value: bool) -> Self {
        if value { Toggle::On } else { Toggle::Off }
    }

    pub fn is_on(self) -> bool {
        matches!(self, Toggle::On)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!("desc".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!(" ASC ".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
    }

    #[test]
    fn settings_enums_serialize_to_blob_values() {
        assert_eq!(serde_json::to_value(SortDirection::Desc).unwrap(), "DESC");
        assert_eq!(serde_json::to_value(OrderBy::MenuOrder).unwrap(), "menu_order");
        assert_eq!(serde_json::to_value(Toggle::Off).unwrap(), "off");
    }
}

//! Registered content types, their per-type knobs and the host extension points.

use std::{collections::BTreeMap, fmt, sync::Arc};

use crate::domain::{content_type::ContentType, error::DomainError, types::ItemStatus};

pub const DEFAULT_BATCH_SIZE: u32 = 50;
pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_PAGE_STRIDE: u32 = 48;
pub const DEFAULT_CHILD_CAP: u32 = 100;
pub const DEFAULT_MAX_DEPTH: u32 = 6;
pub const DEFAULT_LARGE_LIST_THRESHOLD: u64 = 1000;

/// Per-type reorder configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConfig {
    pub content_type: ContentType,
    pub heading: String,
    pub menu_label: String,
    pub intro: Option<String>,
    pub outro: Option<String>,
    pub status: ItemStatus,
    pub batch_size: u32,
    pub page_size: u32,
    pub page_stride: u32,
    pub child_cap: u32,
    pub max_depth: u32,
    pub large_list_threshold: u64,
}

impl TypeConfig {
    pub fn new(content_type: ContentType) -> Self {
        let heading = format!("Reorder {}", content_type.label);
        let menu_label = format!("Reorder {}", content_type.label);
        Self {
            content_type,
            heading,
            menu_label,
            intro: None,
            outro: None,
            status: ItemStatus::Publish,
            batch_size: DEFAULT_BATCH_SIZE,
            page_size: DEFAULT_PAGE_SIZE,
            page_stride: DEFAULT_PAGE_STRIDE,
            child_cap: DEFAULT_CHILD_CAP,
            max_depth: DEFAULT_MAX_DEPTH,
            large_list_threshold: DEFAULT_LARGE_LIST_THRESHOLD,
        }
    }

    pub fn name(&self) -> &str {
        &self.content_type.name
    }

    pub fn hierarchical(&self) -> bool {
        self.content_type.hierarchical
    }

    pub fn validate(&self) -> Result<(), DomainError> {
        if self.batch_size == 0 {
            return Err(DomainError::validation(format!(
                "batch size of `{}` must be positive",
                self.name()
            )));
        }
        if self.page_size == 0 || self.page_stride == 0 {
            return Err(DomainError::validation(format!(
                "page size and stride of `{}` must be positive",
                self.name()
            )));
        }
        if self.page_stride > self.page_size {
            return Err(DomainError::validation(format!(
                "page stride of `{}` cannot exceed its page size",
                self.name()
            )));
        }
        if self.max_depth == 0 {
            return Err(DomainError::validation(format!(
                "max depth of `{}` must be at least 1",
                self.name()
            )));
        }
        Ok(())
    }
}

/// A tab on the settings page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsTab {
    pub key: String,
    pub label: String,
    pub href: String,
}

/// An admin menu entry pointing at one reorder page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub item_type: String,
    pub location: String,
    pub label: String,
    pub href: String,
}

type TypesFilter = dyn Fn(Vec<ContentType>) -> Vec<ContentType> + Send + Sync;
type TypeString = dyn Fn(&ContentType) -> String + Send + Sync;
type TabsFilter = dyn Fn(Vec<SettingsTab>) -> Vec<SettingsTab> + Send + Sync;
type TypePredicate = dyn Fn(&str) -> bool + Send + Sync;

/// Callbacks a host may install to adjust behaviour without touching the core.
#[derive(Clone)]
pub struct ExtensionPoints {
    allowed_types: Option<Arc<TypesFilter>>,
    menu_location: Option<Arc<TypeString>>,
    menu_label: Option<Arc<TypeString>>,
    settings_tabs: Option<Arc<TabsFilter>>,
    suppress_order_override: Option<Arc<TypePredicate>>,
    order_override_enabled: bool,
}

impl Default for ExtensionPoints {
    fn default() -> Self {
        Self {
            allowed_types: None,
            menu_location: None,
            menu_label: None,
            settings_tabs: None,
            suppress_order_override: None,
            order_override_enabled: true,
        }
    }
}

impl fmt::Debug for ExtensionPoints {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionPoints")
            .field("allowed_types", &self.allowed_types.is_some())
            .field("menu_location", &self.menu_location.is_some())
            .field("menu_label", &self.menu_label.is_some())
            .field("settings_tabs", &self.settings_tabs.is_some())
            .field(
                "suppress_order_override",
                &self.suppress_order_override.is_some(),
            )
            .field("order_override_enabled", &self.order_override_enabled)
            .finish()
    }
}

impl ExtensionPoints {
    pub fn with_allowed_types(
        mut self,
        filter: impl Fn(Vec<ContentType>) -> Vec<ContentType> + Send + Sync + 'static,
    ) -> Self {
        self.allowed_types = Some(Arc::new(filter));
        self
    }

    pub fn with_menu_location(
        mut self,
        location: impl Fn(&ContentType) -> String + Send + Sync + 'static,
    ) -> Self {
        self.menu_location = Some(Arc::new(location));
        self
    }

    pub fn with_menu_label(
        mut self,
        label: impl Fn(&ContentType) -> String + Send + Sync + 'static,
    ) -> Self {
        self.menu_label = Some(Arc::new(label));
        self
    }

    pub fn with_settings_tabs(
        mut self,
        tabs: impl Fn(Vec<SettingsTab>) -> Vec<SettingsTab> + Send + Sync + 'static,
    ) -> Self {
        self.settings_tabs = Some(Arc::new(tabs));
        self
    }

    pub fn with_suppress_order_override(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.suppress_order_override = Some(Arc::new(predicate));
        self
    }

    pub fn with_order_override_enabled(mut self, enabled: bool) -> Self {
        self.order_override_enabled = enabled;
        self
    }

    pub fn order_override_enabled(&self) -> bool {
        self.order_override_enabled
    }

    pub fn suppresses_order_override(&self, item_type: &str) -> bool {
        self.suppress_order_override
            .as_ref()
            .is_some_and(|predicate| predicate(item_type))
    }
}

/// Registry of reorderable types. Built once at startup and shared.
#[derive(Debug, Clone)]
pub struct ReorderRegistry {
    types: BTreeMap<String, TypeConfig>,
    order: Vec<String>,
    extensions: ExtensionPoints,
}

impl ReorderRegistry {
    pub fn new(
        configs: Vec<TypeConfig>,
        extensions: ExtensionPoints,
    ) -> Result<Self, DomainError> {
        let mut types = BTreeMap::new();
        let mut order = Vec::with_capacity(configs.len());
        for config in configs {
            config.validate()?;
            let name = config.name().to_string();
            if types.contains_key(&name) {
                return Err(DomainError::validation(format!(
                    "content type `{name}` is registered twice"
                )));
            }
            order.push(name.clone());
            types.insert(name, config);
        }

        Ok(Self {
            types,
            order,
            extensions,
        })
    }

    /// `post` (flat) and `page` (hierarchical) with default knobs.
    pub fn with_defaults(extensions: ExtensionPoints) -> Result<Self, DomainError> {
        Self::new(
            vec![
                TypeConfig::new(ContentType::new("post", "Posts", false)?),
                TypeConfig::new(ContentType::new("page", "Pages", true)?),
            ],
            extensions,
        )
    }

    pub fn extensions(&self) -> &ExtensionPoints {
        &self.extensions
    }

    /// Types offered for reordering, after the `allowed_types` callback.
    pub fn allowed_types(&self) -> Vec<ContentType> {
        let all: Vec<ContentType> = self
            .order
            .iter()
            .filter_map(|name| self.types.get(name))
            .map(|config| config.content_type.clone())
            .collect();

        match self.extensions.allowed_types.as_ref() {
            Some(filter) => filter(all)
                .into_iter()
                .filter(|ty| self.types.contains_key(&ty.name))
                .collect(),
            None => all,
        }
    }

    /// Configuration of an allowed type.
    pub fn get(&self, name: &str) -> Option<&TypeConfig> {
        if self.allowed_types().iter().any(|ty| ty.name == name) {
            self.types.get(name)
        } else {
            None
        }
    }

    pub fn require(&self, name: &str) -> Result<&TypeConfig, DomainError> {
        self.get(name)
            .ok_or_else(|| DomainError::unknown_type(name))
    }

    pub fn menu_entries(&self) -> Vec<MenuEntry> {
        self.allowed_types()
            .into_iter()
            .filter_map(|ty| {
                let config = self.types.get(&ty.name)?;
                let location = match self.extensions.menu_location.as_ref() {
                    Some(location) => location(&ty),
                    None => default_menu_location(&ty),
                };
                let label = match self.extensions.menu_label.as_ref() {
                    Some(label) => label(&ty),
                    None => config.menu_label.clone(),
                };
                Some(MenuEntry {
                    href: format!("/reorder/{}", ty.name),
                    item_type: ty.name,
                    location,
                    label,
                })
            })
            .collect()
    }

    pub fn settings_tabs(&self) -> Vec<SettingsTab> {
        let tabs = vec![SettingsTab {
            key: "types".to_string(),
            label: "Content types".to_string(),
            href: "/settings".to_string(),
        }];
        match self.extensions.settings_tabs.as_ref() {
            Some(filter) => filter(tabs),
            None => tabs,
        }
    }
}

fn default_menu_location(ty: &ContentType) -> String {
    if ty.name == "post" {
        "posts".to_string()
    } else {
        format!("{}s", ty.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry(extensions: ExtensionPoints) -> ReorderRegistry {
        ReorderRegistry::with_defaults(extensions).expect("default registry")
    }

    #[test]
    fn defaults_register_post_and_page() {
        let registry = registry(ExtensionPoints::default());
        let names: Vec<String> = registry.allowed_types().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["post", "page"]);
        assert!(registry.require("page").expect("page").hierarchical());
        assert!(!registry.require("post").expect("post").hierarchical());
        assert!(matches!(
            registry.require("product"),
            Err(DomainError::UnknownType { .. })
        ));
    }

    #[test]
    fn allowed_types_callback_hides_types() {
        let registry = registry(
            ExtensionPoints::default().with_allowed_types(|types| {
                types.into_iter().filter(|t| t.name != "post").collect()
            }),
        );
        assert!(registry.get("post").is_none());
        assert!(registry.get("page").is_some());
        assert_eq!(registry.menu_entries().len(), 1);
    }

    #[test]
    fn menu_callbacks_override_placement() {
        let registry = registry(
            ExtensionPoints::default()
                .with_menu_location(|_| "tools".to_string())
                .with_menu_label(|ty| format!("Sort {}", ty.label)),
        );
        let entries = registry.menu_entries();
        assert!(entries.iter().all(|entry| entry.location == "tools"));
        assert_eq!(entries[1].label, "Sort Pages");
        assert_eq!(entries[1].href, "/reorder/page");
    }

    #[test]
    fn rejects_stride_larger_than_page() {
        let mut config = TypeConfig::new(ContentType::new("post", "Posts", false).expect("type"));
        config.page_stride = config.page_size + 1;
        assert!(ReorderRegistry::new(vec![config], ExtensionPoints::default()).is_err());
    }

    #[test]
    fn rejects_duplicate_types() {
        let ty = ContentType::new("post", "Posts", false).expect("type");
        let configs = vec![TypeConfig::new(ty.clone()), TypeConfig::new(ty)];
        assert!(ReorderRegistry::new(configs, ExtensionPoints::default()).is_err());
    }
}

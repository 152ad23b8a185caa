mod reorder;
mod settings;

pub use reorder::{
    AdminReorderTemplate, PageLinkView, ReorderNodeTemplate, ReorderPageView, render_tree,
};
pub use settings::{
    AdminSettingsTemplate, SettingsChoiceView, SettingsTabView, SettingsTypeRowView,
    SettingsView,
};

#[derive(Clone)]
pub struct AdminNavigationItemView {
    pub label: String,
    pub href: String,
    pub location: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct AdminChrome {
    pub title: String,
    pub navigation: Vec<AdminNavigationItemView>,
}

#[derive(Clone)]
pub struct AdminLayout<T> {
    pub chrome: AdminChrome,
    pub page_title: String,
    pub asset_version: String,
    pub content: T,
}

impl<T> AdminLayout<T> {
    pub fn new(chrome: AdminChrome, page_title: impl Into<String>, content: T) -> Self {
        Self {
            chrome,
            page_title: page_title.into(),
            asset_version: asset_version(),
            content,
        }
    }
}

fn asset_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

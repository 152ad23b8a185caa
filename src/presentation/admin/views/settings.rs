use askama::Template;

use super::AdminLayout;

#[derive(Clone)]
pub struct SettingsTabView {
    pub label: String,
    pub href: String,
    pub is_active: bool,
}

#[derive(Clone)]
pub struct SettingsChoiceView {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

#[derive(Clone)]
pub struct SettingsTypeRowView {
    pub name: String,
    pub label: String,
    pub enabled: bool,
    pub orderby: Vec<SettingsChoiceView>,
    pub order: Vec<SettingsChoiceView>,
}

#[derive(Clone)]
pub struct SettingsView {
    pub heading: String,
    pub tabs: Vec<SettingsTabView>,
    pub rows: Vec<SettingsTypeRowView>,
    pub form_action: String,
    pub nonce: String,
    pub notice: Option<String>,
}

#[derive(Template)]
#[template(path = "admin/settings.html")]
pub struct AdminSettingsTemplate {
    pub view: AdminLayout<SettingsView>,
}

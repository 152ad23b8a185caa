use crate::application::registry::ReorderRegistry;
use crate::presentation::admin::views::{AdminChrome, AdminNavigationItemView};

pub(super) fn admin_chrome(
    state_title: &str,
    registry: &ReorderRegistry,
    active_href: &str,
) -> AdminChrome {
    let mut navigation: Vec<AdminNavigationItemView> = registry
        .menu_entries()
        .into_iter()
        .map(|entry| AdminNavigationItemView {
            is_active: entry.href == active_href,
            label: entry.label,
            href: entry.href,
            location: entry.location,
        })
        .collect();

    navigation.push(AdminNavigationItemView {
        label: "Settings".to_string(),
        href: "/settings".to_string(),
        location: "settings".to_string(),
        is_active: active_href == "/settings",
    });

    AdminChrome {
        title: state_title.to_string(),
        navigation,
    }
}

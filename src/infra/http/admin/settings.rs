use std::collections::{BTreeSet, HashMap};

use axum::{
    Extension, Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    application::{
        access::{Capability, Principal},
        error::HttpError,
        settings::{SettingsError, TypeSettingsInput, UpdateReorderSettingsCommand},
    },
    domain::{
        entities::ReorderSettingsRecord,
        types::{OrderBy, SortDirection},
    },
    infra::http::repo_error_to_http,
    presentation::{
        admin::views::{
            AdminLayout, AdminSettingsTemplate, SettingsChoiceView, SettingsTabView,
            SettingsTypeRowView, SettingsView,
        },
        views::render_template_response,
    },
};

use super::{AdminState, chrome::admin_chrome};

/// Nonce action protecting the settings form.
pub const SETTINGS_ACTION: &str = "reorder_settings";

const ENABLED_PREFIX: &str = "enabled__";
const ORDERBY_PREFIX: &str = "orderby__";
const ORDER_PREFIX: &str = "order__";

#[derive(Debug, Deserialize)]
pub(super) struct SettingsQuery {
    #[serde(default)]
    updated: Option<u8>,
}

pub(super) async fn admin_settings(
    State(state): State<AdminState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<SettingsQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin::settings::admin_settings";

    if let Err(err) = ensure_manage_options(SOURCE, &principal) {
        return err.into_response();
    }

    let record = match state.settings.load().await {
        Ok(record) => record,
        Err(err) => return settings_error_to_http(SOURCE, err).into_response(),
    };

    let notice = query
        .updated
        .filter(|flag| *flag == 1)
        .map(|_| "Settings saved.".to_string());
    let content = settings_view(&state, &record, &principal, notice);
    let chrome = admin_chrome(&state.brand_title, &state.registry, "/settings");

    render_template_response(
        AdminSettingsTemplate {
            view: AdminLayout::new(chrome, "Reorder settings", content),
        },
        StatusCode::OK,
    )
}

pub(super) async fn admin_settings_update(
    State(state): State<AdminState>,
    Extension(principal): Extension<Principal>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    const SOURCE: &str = "infra::http::admin::settings::admin_settings_update";

    let nonce = form.get("nonce").map(String::as_str).unwrap_or_default();
    if !state.nonces.verify(nonce, SETTINGS_ACTION, &principal.name) {
        return HttpError::new(
            SOURCE,
            StatusCode::FORBIDDEN,
            "Forbidden",
            "settings nonce rejected",
        )
        .into_response();
    }

    if let Err(err) = ensure_manage_options(SOURCE, &principal) {
        return err.into_response();
    }

    let registered: Vec<String> = state
        .registry
        .allowed_types()
        .into_iter()
        .map(|ty| ty.name)
        .collect();

    let command = match parse_settings_form(&form, &registered) {
        Ok(command) => command,
        Err(message) => {
            return HttpError::new(
                SOURCE,
                StatusCode::BAD_REQUEST,
                "Invalid settings",
                message,
            )
            .into_response();
        }
    };

    match state.settings.update(&principal.name, command).await {
        Ok(_) => Redirect::to("/settings?updated=1").into_response(),
        Err(err) => settings_error_to_http(SOURCE, err).into_response(),
    }
}

fn ensure_manage_options(source: &'static str, principal: &Principal) -> Result<(), HttpError> {
    if principal.can(Capability::ManageOptions) {
        Ok(())
    } else {
        Err(HttpError::new(
            source,
            StatusCode::FORBIDDEN,
            "Forbidden",
            format!("`{}` may not manage options", principal.name),
        ))
    }
}

fn settings_error_to_http(source: &'static str, err: SettingsError) -> HttpError {
    match err {
        SettingsError::UnknownType(name) => HttpError::new(
            source,
            StatusCode::BAD_REQUEST,
            "Invalid settings",
            format!("content type `{name}` is not registered"),
        ),
        SettingsError::Repo(err) => repo_error_to_http(source, err),
    }
}

/// Build the update command from `enabled__{type}`, `orderby__{type}` and
/// `order__{type}` fields. Registered types without a checked box are
/// disabled; fields naming other types are passed through so the update is
/// rejected.
fn parse_settings_form(
    form: &HashMap<String, String>,
    registered: &[String],
) -> Result<UpdateReorderSettingsCommand, String> {
    let mut names: BTreeSet<&str> = registered.iter().map(String::as_str).collect();
    for key in form.keys() {
        for prefix in [ENABLED_PREFIX, ORDERBY_PREFIX, ORDER_PREFIX] {
            if let Some(name) = key.strip_prefix(prefix) {
                names.insert(name);
            }
        }
    }

    let mut types = Vec::with_capacity(names.len());
    for name in names {
        let orderby = match form.get(&format!("{ORDERBY_PREFIX}{name}")) {
            Some(value) => value.parse::<OrderBy>().map_err(|err| err.to_string())?,
            None => OrderBy::default(),
        };
        let order = match form.get(&format!("{ORDER_PREFIX}{name}")) {
            Some(value) => value
                .parse::<SortDirection>()
                .map_err(|err| err.to_string())?,
            None => SortDirection::default(),
        };
        types.push(TypeSettingsInput {
            item_type: name.to_string(),
            enabled: form.contains_key(&format!("{ENABLED_PREFIX}{name}")),
            orderby,
            order,
        });
    }

    Ok(UpdateReorderSettingsCommand { types })
}

fn settings_view(
    state: &AdminState,
    record: &ReorderSettingsRecord,
    principal: &Principal,
    notice: Option<String>,
) -> SettingsView {
    let rows = state
        .registry
        .allowed_types()
        .into_iter()
        .map(|ty| {
            let ordering = record.ordering_for(&ty.name);
            SettingsTypeRowView {
                enabled: record.is_enabled(&ty.name),
                orderby: [OrderBy::None, OrderBy::MenuOrder]
                    .into_iter()
                    .map(|value| SettingsChoiceView {
                        value: value.as_str(),
                        label: match value {
                            OrderBy::None => "Default (date)",
                            OrderBy::MenuOrder => "Custom order",
                        },
                        selected: value == ordering.orderby,
                    })
                    .collect(),
                order: [SortDirection::Asc, SortDirection::Desc]
                    .into_iter()
                    .map(|value| SettingsChoiceView {
                        value: value.as_str(),
                        label: match value {
                            SortDirection::Asc => "Ascending",
                            SortDirection::Desc => "Descending",
                        },
                        selected: value == ordering.order,
                    })
                    .collect(),
                name: ty.name,
                label: ty.label,
            }
        })
        .collect();

    let tabs = state
        .registry
        .settings_tabs()
        .into_iter()
        .map(|tab| SettingsTabView {
            is_active: tab.href == "/settings",
            label: tab.label,
            href: tab.href,
        })
        .collect();

    SettingsView {
        heading: "Reorder settings".to_string(),
        tabs,
        rows,
        form_action: "/settings".to_string(),
        nonce: state.nonces.issue(SETTINGS_ACTION, &principal.name),
        notice,
    }
}

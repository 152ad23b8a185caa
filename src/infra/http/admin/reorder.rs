use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::{HeaderValue, StatusCode, header::CACHE_CONTROL},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{Form, FormRejection};
use reorder_api_types::{BatchRequestForm, BatchResponseBody, SORT_ACTION};
use serde::Deserialize;

use crate::{
    application::{
        access::{Capability, Principal},
        error::HttpError,
        listing::{ListingError, ListingPage},
        reorder::{MovedItem, RenumberBatchRequest, ReorderError},
    },
    domain::{entities::ROOT_PARENT, error::DomainError},
    infra::http::repo_error_to_http,
    presentation::{
        admin::views::{
            AdminLayout, AdminReorderTemplate, PageLinkView, ReorderPageView, render_tree,
        },
        views::{TemplateRenderError, render_template_response},
    },
};

use super::{AdminState, chrome::admin_chrome};

const BATCH_SOURCE: &str = "infra::http::admin::reorder::admin_reorder_batch";

pub(super) async fn admin_reorder_batch(
    State(state): State<AdminState>,
    Extension(principal): Extension<Principal>,
    form: Result<Form<BatchRequestForm>, FormRejection>,
) -> Response {
    let Form(form) = match form {
        Ok(form) => form,
        Err(rejection) => {
            return HttpError::bare(BATCH_SOURCE, StatusCode::BAD_REQUEST, rejection.to_string())
                .into_response();
        }
    };

    if form.action != SORT_ACTION {
        return HttpError::bare(
            BATCH_SOURCE,
            StatusCode::BAD_REQUEST,
            format!("unexpected action `{}`", form.action),
        )
        .into_response();
    }

    if !state.nonces.verify(&form.nonce, SORT_ACTION, &principal.name) {
        return HttpError::bare(BATCH_SOURCE, StatusCode::FORBIDDEN, "nonce rejected")
            .into_response();
    }

    if !principal.can(Capability::EditItems) {
        return HttpError::bare(
            BATCH_SOURCE,
            StatusCode::FORBIDDEN,
            format!("`{}` may not edit items", principal.name),
        )
        .into_response();
    }

    let request = match batch_request_from_form(&form) {
        Ok(request) => request,
        Err(err) => {
            return HttpError::from_error(BATCH_SOURCE, StatusCode::BAD_REQUEST, "", &err)
                .into_response();
        }
    };

    match state.reorder.run_batch(request.clone()).await {
        Ok(outcome) => {
            let moved = outcome
                .response
                .moved
                .unwrap_or(MovedItem { id: 0, ordinal: 0 });
            let body = BatchResponseBody {
                more_posts: outcome.response.has_more,
                post_parent: request.parent_id,
                post_id: moved.id,
                menu_order: moved.ordinal,
                post_type: request.item_type,
                excluded: outcome.response.excluded,
                start: outcome.response.next_start_offset,
            };
            let mut response = Json(body).into_response();
            response
                .headers_mut()
                .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
            response
        }
        Err(err) => {
            let status = match err {
                ReorderError::Malformed(_) => StatusCode::BAD_REQUEST,
                ReorderError::Repo(_) | ReorderError::Settings(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            HttpError::from_error(BATCH_SOURCE, status, "", &err).into_response()
        }
    }
}

/// Translate the wire form. Missing numeric fields read as zero; a zero
/// `post_id` means the pass has no moved item.
fn batch_request_from_form(form: &BatchRequestForm) -> Result<RenumberBatchRequest, ReorderError> {
    let item_type = form
        .post_type
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ReorderError::malformed("post_type is required"))?;

    let moved = match form.post_id.unwrap_or(0) {
        0 => None,
        id => Some(MovedItem {
            id,
            ordinal: form.menu_order.unwrap_or(0),
        }),
    };

    Ok(RenumberBatchRequest {
        item_type: item_type.to_string(),
        parent_id: form.post_parent.unwrap_or(ROOT_PARENT),
        start_offset: form.start.unwrap_or(0),
        moved,
        excluded: form.excluded.clone(),
    })
}

#[derive(Debug, Deserialize)]
pub(super) struct ReorderPageQuery {
    #[serde(default)]
    paged: Option<u32>,
}

pub(super) async fn admin_reorder_page(
    State(state): State<AdminState>,
    Extension(principal): Extension<Principal>,
    Path(item_type): Path<String>,
    Query(query): Query<ReorderPageQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::admin::reorder::admin_reorder_page";

    if !principal.can(Capability::EditItems) {
        return HttpError::new(
            SOURCE,
            StatusCode::FORBIDDEN,
            "Forbidden",
            format!("`{}` may not edit items", principal.name),
        )
        .into_response();
    }

    let page = match state.listing.page(&item_type, query.paged.unwrap_or(1)).await {
        Ok(page) => page,
        Err(err) => return listing_error_to_http(SOURCE, err).into_response(),
    };

    let tree_html = match render_tree(&page.nodes, page.config.name()) {
        Ok(html) => html,
        Err(err) => {
            return HttpError::from(TemplateRenderError::new(
                SOURCE,
                "Template rendering failed",
                err,
            ))
            .into_response();
        }
    };

    let active_href = format!("/reorder/{}", page.config.name());
    let chrome = admin_chrome(&state.brand_title, &state.registry, &active_href);
    let nonce = state.nonces.issue(SORT_ACTION, &principal.name);
    let content = reorder_page_view(&page, nonce, tree_html);
    let title = page.config.heading.clone();

    render_template_response(
        AdminReorderTemplate {
            view: AdminLayout::new(chrome, title, content),
        },
        StatusCode::OK,
    )
}

fn reorder_page_view(page: &ListingPage, nonce: String, tree_html: String) -> ReorderPageView {
    let config = &page.config;
    let pages = (1..=page.page_count)
        .map(|number| PageLinkView {
            number,
            href: format!("/reorder/{}?paged={number}", config.name()),
            is_current: number == page.page,
        })
        .collect();

    ReorderPageView {
        heading: config.heading.clone(),
        item_type: config.name().to_string(),
        intro: config.intro.clone(),
        outro: config.outro.clone(),
        hierarchical: config.hierarchical(),
        nonce,
        batch_url: "/reorder/batch".to_string(),
        base_offset: page.base_offset,
        large_list_warning: page.large_list.then(|| {
            format!(
                "This list holds {} items. Saving a new order may take a while.",
                page.total_items
            )
        }),
        tree_html,
        is_empty: page.is_empty(),
        pages,
    }
}

fn listing_error_to_http(source: &'static str, err: ListingError) -> HttpError {
    match err {
        ListingError::Domain(DomainError::UnknownType { name }) => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Unknown content type",
            format!("content type `{name}` is not registered"),
        ),
        ListingError::Disabled(name) => HttpError::new(
            source,
            StatusCode::NOT_FOUND,
            "Reordering is disabled for this content type",
            format!("reordering disabled for `{name}`"),
        ),
        ListingError::Repo(err) => repo_error_to_http(source, err),
        other => HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &other,
        ),
    }
}

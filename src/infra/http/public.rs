use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;

use crate::{
    application::{
        error::HttpError,
        public_listing::{PublicListingError, PublicListingService},
        repos::HealthRepo,
    },
    domain::error::DomainError,
};

use super::{
    db_health_response,
    middleware::{log_responses, set_request_context},
    repo_error_to_http,
};

#[derive(Clone)]
pub struct PublicState {
    pub listing: Arc<PublicListingService>,
    pub health: Arc<dyn HealthRepo>,
}

pub fn build_public_router(state: PublicState) -> Router {
    Router::new()
        .route("/items/{item_type}", get(list_items))
        .route("/_health/db", get(health))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    #[serde(default)]
    limit: Option<u32>,
}

async fn list_items(
    State(state): State<PublicState>,
    Path(item_type): Path<String>,
    Query(query): Query<ListQuery>,
) -> Response {
    const SOURCE: &str = "infra::http::public::list_items";

    match state.listing.list(&item_type, query.limit).await {
        Ok(listing) => Json(listing).into_response(),
        Err(PublicListingError::Domain(DomainError::UnknownType { name })) => HttpError::new(
            SOURCE,
            StatusCode::NOT_FOUND,
            "Unknown content type",
            format!("content type `{name}` is not registered"),
        )
        .into_response(),
        Err(PublicListingError::Repo(err)) => repo_error_to_http(SOURCE, err).into_response(),
        Err(other) => HttpError::from_error(
            SOURCE,
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error",
            &other,
        )
        .into_response(),
    }
}

async fn health(State(state): State<PublicState>) -> Response {
    db_health_response(state.health.health_check().await)
}

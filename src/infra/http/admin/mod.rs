mod chrome;
mod health;
mod reorder;
mod settings;
mod state;

pub use settings::SETTINGS_ACTION;
pub use state::AdminState;

use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};

use crate::infra::assets;

use super::middleware::{admin_auth, log_responses, set_request_context};

pub fn build_admin_router(state: AdminState) -> Router {
    let protected = Router::new()
        .route("/", get(|| async { Redirect::to("/settings") }))
        .route("/reorder/batch", post(reorder::admin_reorder_batch))
        .route("/reorder/{item_type}", get(reorder::admin_reorder_page))
        .route(
            "/settings",
            get(settings::admin_settings).post(settings::admin_settings_update),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth));

    Router::new()
        .merge(protected)
        .route("/_health/db", get(health::admin_health))
        .route("/static/admin/{*path}", get(assets::serve_admin))
        .with_state(state)
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn(set_request_context))
}

use std::sync::Arc;

use axum::http::HeaderName;

use crate::application::{
    access::AccessPolicy, listing::ListingService, nonce::NonceService,
    registry::ReorderRegistry, reorder::ReorderService, repos::HealthRepo,
    settings::ReorderSettingsService,
};

#[derive(Clone)]
pub struct AdminState {
    pub health: Arc<dyn HealthRepo>,
    pub registry: Arc<ReorderRegistry>,
    pub reorder: Arc<ReorderService>,
    pub listing: Arc<ListingService>,
    pub settings: Arc<ReorderSettingsService>,
    pub nonces: Arc<NonceService>,
    pub access: Arc<AccessPolicy>,
    pub identity_header: HeaderName,
    pub brand_title: String,
}

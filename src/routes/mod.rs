pub mod bids;
pub mod health;
pub mod me;
pub mod rfps;

use axum::{routing::get, routing::post, Router};
use std::sync::Arc;

use crate::app::AppState;

/// Build the API router with all routes
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        // Public routes
        .route("/health", get(health::health_check))
        // Protected routes
        .route("/me", get(me::get_me))
        // RFPs
        .route("/rfps", post(rfps::create_rfp))
        .route("/rfps", get(rfps::list_rfps))
        .route("/rfps/:rfp_id", get(rfps::get_rfp))
        .route("/rfps/:rfp_id/publish", post(rfps::publish_rfp))
        .route("/rfps/:rfp_id/award", post(rfps::select_winning_bid))
        // Bids (nested under RFPs)
        .route("/rfps/:rfp_id/bids", post(bids::submit_bid))
        .route("/rfps/:rfp_id/bids", get(bids::list_bids))
}

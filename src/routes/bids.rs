//! Bid routes
//!
//! Bid submission and listing for published RFPs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{BidResponse, SubmitBidRequest};
use crate::error::ApiResult;

/// POST /rfps/:rfp_id/bids
///
/// Submit a bid while the RFP's bidding window is open.
pub async fn submit_bid(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(rfp_id): Path<Uuid>,
    Json(req): Json<SubmitBidRequest>,
) -> ApiResult<Created<DataResponse<BidResponse>>> {
    tracing::info!(
        actor_id = %auth.actor.id,
        rfp_id = %rfp_id,
        price = req.price,
        "Submitting bid"
    );

    let bid = state.registry.submit_bid(&auth.actor, rfp_id, req).await?;
    Ok(Created(DataResponse::new(bid.into())))
}

/// GET /rfps/:rfp_id/bids
///
/// List bids on an RFP. The owning municipality sees all bids; a developer
/// sees only their own.
pub async fn list_bids(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(rfp_id): Path<Uuid>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<BidResponse>> {
    let bids = state.registry.list_bids(&auth.actor, rfp_id).await?;

    let total = bids.len() as u64;
    let data: Vec<BidResponse> = bids
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.per_page() as usize)
        .map(Into::into)
        .collect();

    Ok(Paginated::new(data, &pagination, total))
}

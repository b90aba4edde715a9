//! RFP routes
//!
//! Drafting, publishing, listing and awarding RFPs.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::api::{Created, DataResponse, Paginated, PaginationParams};
use crate::app::AppState;
use crate::auth::RequireAuth;
use crate::domain::{CreateRfpRequest, ProjectResponse, RfpResponse, RfpStatus};
use crate::error::{ApiError, ApiResult};
use crate::procurement::ProcurementError;
use crate::services::AwardCompleted;

/// POST /rfps
///
/// Create an RFP draft.
pub async fn create_rfp(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateRfpRequest>,
) -> ApiResult<Created<DataResponse<RfpResponse>>> {
    tracing::info!(
        actor_id = %auth.actor.id,
        municipality_id = %req.municipality_id,
        title = %req.title,
        "Creating RFP draft"
    );

    let rfp = state.lifecycle.create_draft(&auth.actor, req).await?;
    Ok(Created(DataResponse::new(rfp.into())))
}

#[derive(Debug, Deserialize)]
pub struct RfpFilter {
    pub status: Option<RfpStatus>,
}

/// GET /rfps?status=
///
/// List RFPs, optionally filtered by status.
pub async fn list_rfps(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Query(filter): Query<RfpFilter>,
    Query(pagination): Query<PaginationParams>,
) -> ApiResult<Paginated<RfpResponse>> {
    let rfps = state
        .store
        .list_rfps(filter.status)
        .await
        .map_err(ProcurementError::from)?;

    let total = rfps.len() as u64;
    let data: Vec<RfpResponse> = rfps
        .into_iter()
        .skip(pagination.offset() as usize)
        .take(pagination.per_page() as usize)
        .map(Into::into)
        .collect();

    Ok(Paginated::new(data, &pagination, total))
}

/// GET /rfps/:rfp_id
pub async fn get_rfp(
    _auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(rfp_id): Path<Uuid>,
) -> ApiResult<DataResponse<RfpResponse>> {
    let rfp = state
        .store
        .get_rfp(rfp_id)
        .await
        .map_err(ProcurementError::from)?
        .ok_or_else(|| ApiError::not_found("RFP not found"))?;

    Ok(DataResponse::new(rfp.into()))
}

/// POST /rfps/:rfp_id/publish
///
/// Open the RFP's bidding window.
pub async fn publish_rfp(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(rfp_id): Path<Uuid>,
) -> ApiResult<DataResponse<RfpResponse>> {
    tracing::info!(actor_id = %auth.actor.id, rfp_id = %rfp_id, "Publishing RFP");

    let rfp = state.lifecycle.publish(&auth.actor, rfp_id).await?;
    Ok(DataResponse::new(rfp.into()))
}

#[derive(Debug, Deserialize)]
pub struct AwardRequest {
    pub bid_id: Uuid,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// POST /rfps/:rfp_id/award
///
/// Select the winning bid, closing the RFP and creating its project.
/// Replaying a completed award returns the existing project.
pub async fn select_winning_bid(
    auth: RequireAuth,
    State(state): State<Arc<AppState>>,
    Path(rfp_id): Path<Uuid>,
    Json(req): Json<AwardRequest>,
) -> ApiResult<DataResponse<ProjectResponse>> {
    tracing::info!(
        actor_id = %auth.actor.id,
        rfp_id = %rfp_id,
        bid_id = %req.bid_id,
        "Awarding RFP"
    );

    let award = state
        .coordinator
        .select_winner(&auth.actor, rfp_id, req.bid_id, req.idempotency_key)
        .await?;

    // Replays return the existing project without re-announcing the award
    if award.fresh {
        state.events.publish_award_completed(AwardCompleted {
            rfp_id,
            project_id: award.project.id,
            winning_bid_id: award.project.winning_bid_id,
        });
    }

    Ok(DataResponse::new(award.project.into()))
}

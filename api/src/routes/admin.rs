//! Admin Endpoints
//!
//! 신청서 승인/거절과 dead letter 조회.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::{Application, DeadLetter, DistributorHolding, Film},
    error::ApiError,
    services::approvals,
    types::ApiResponse,
    AppState,
};

const DEFAULT_DEAD_LETTER_LIMIT: i64 = 100;
const MAX_DEAD_LETTER_LIMIT: i64 = 500;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveDistributorRequest {
    pub film_id: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributorApprovalResponse {
    pub application: Application,
    pub holding: DistributorHolding,
    pub created: bool,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// POST /api/admin/filmmakers/:id/approve
///
/// 영화를 새로 만들면 201, 이미 승인된 신청서면 200
pub async fn approve_filmmaker(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<(StatusCode, Json<ApiResponse<Film>>), ApiError> {
    let approval = approvals::approve_filmmaker(state.store.as_ref(), &state.side_effects, id).await?;
    let (status, message) = if approval.created {
        (StatusCode::CREATED, "Filmmaker approved")
    } else {
        (StatusCode::OK, "Filmmaker already approved")
    };
    Ok((status, Json(ApiResponse::with_message(approval.film, message))))
}

/// POST /api/admin/distributors/:id/approve
///
/// body: `{ "filmId": 1 }`. holding을 새로 만들면 201, 이미 있으면 200
pub async fn approve_distributor(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<ApproveDistributorRequest>,
) -> Result<(StatusCode, Json<ApiResponse<DistributorApprovalResponse>>), ApiError> {
    let film_id = req
        .film_id
        .ok_or_else(|| ApiError::ValidationError("filmId is required".to_string()))?;

    let approval = approvals::approve_distributor(
        state.store.as_ref(),
        &state.side_effects,
        &state.config.app_url,
        id,
        film_id,
    )
    .await?;

    let status = if approval.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let message = if approval.created {
        "Distributor approved and DDT assigned"
    } else {
        "Distributor already holds a DDT for this film"
    };

    Ok((
        status,
        Json(ApiResponse::with_message(
            DistributorApprovalResponse {
                application: approval.application,
                holding: approval.holding,
                created: approval.created,
            },
            message,
        )),
    ))
}

/// POST /api/admin/applications/:id/reject
pub async fn reject_application(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Application>>, ApiError> {
    let application =
        approvals::reject_application(state.store.as_ref(), &state.side_effects, id).await?;
    Ok(Json(ApiResponse::with_message(application, "Application rejected")))
}

/// GET /api/admin/dead-letters?limit=100
pub async fn list_dead_letters(
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<DeadLetter>>>, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_DEAD_LETTER_LIMIT)
        .clamp(1, MAX_DEAD_LETTER_LIMIT);
    let letters = state.store.list_dead_letters(limit).await?;
    Ok(Json(ApiResponse::success(letters)))
}

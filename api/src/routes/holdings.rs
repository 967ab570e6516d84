//! DDT Holding / Referral Endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::DistributorHolding,
    error::ApiError,
    types::{ApiResponse, UsdAmount},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingQuery {
    pub distributor_id: Option<i64>,
    pub film_id: Option<i64>,
}

/// 보유 기록이 없을 때 반환하는 빈 holding
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmptyHolding {
    pub id: Option<i64>,
    pub personalized_link: Option<String>,
    pub sales_attributed: UsdAmount,
    pub earned_amount: UsdAmount,
    pub ddt_balance: i64,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum HoldingResponse {
    Found(DistributorHolding),
    Empty(EmptyHolding),
}

/// GET /api/ddt/holding?distributorId=..&filmId=..
///
/// distributor가 아직 DDT를 받지 않았으면 잔액 0인 빈 holding을 반환
pub async fn get_holding(
    State(state): State<AppState>,
    Query(query): Query<HoldingQuery>,
) -> Result<Json<ApiResponse<HoldingResponse>>, ApiError> {
    let (Some(distributor_id), Some(film_id)) = (query.distributor_id, query.film_id) else {
        return Err(ApiError::BadRequest("Missing distributorId or filmId".to_string()));
    };

    let response = match state.store.find_holding(distributor_id, film_id).await? {
        Some(holding) => HoldingResponse::Found(holding),
        None => HoldingResponse::Empty(EmptyHolding {
            id: None,
            personalized_link: None,
            sales_attributed: UsdAmount::ZERO,
            earned_amount: UsdAmount::ZERO,
            ddt_balance: 0,
        }),
    };

    Ok(Json(ApiResponse::success(response)))
}

/// GET /api/referrals/:code
pub async fn resolve_referral(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<DistributorHolding>>, ApiError> {
    let holding = state
        .store
        .find_holding_by_referral(&code)
        .await?
        .ok_or_else(|| ApiError::NotFound("Referral code not found".to_string()))?;
    Ok(Json(ApiResponse::success(holding)))
}

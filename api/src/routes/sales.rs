//! Sales Endpoints
//!
//! distributor 링크를 통한 판매 기록과 조회.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    db::{SaleFilter, SaleRecord},
    error::ApiError,
    services::sales::{self, RecordSaleInput, SaleOutcome},
    types::{ApiResponse, UsdAmount},
    AppState,
};

/// 판매 기록 요청
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordSaleRequest {
    pub film_id: Option<i64>,
    pub distributor_id: Option<i64>,
    pub holding_id: Option<i64>,
    pub referral_code: Option<String>,
    /// USD
    pub sale_amount: Option<f64>,
    pub buyer_email: Option<String>,
    pub payment_method: Option<String>,
    pub payment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesQuery {
    pub film_id: Option<i64>,
    pub distributor_id: Option<i64>,
}

/// POST /api/sales/record-sale
///
/// # Flow
///
/// 1. sale record 저장
/// 2. 70/20/10 payout 저장
/// 3. holding 수익 증가
/// 4. 영화 누적 판매액 증가
/// 5. 온체인 기록 작업 enqueue (해시는 작업 성공 후 저장)
pub async fn record_sale(
    State(state): State<AppState>,
    Json(req): Json<RecordSaleRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SaleOutcome>>), ApiError> {
    let (Some(film_id), Some(distributor_id), Some(sale_amount)) =
        (req.film_id, req.distributor_id, req.sale_amount)
    else {
        return Err(ApiError::ValidationError("Missing required fields".to_string()));
    };

    let amount = UsdAmount::from_dollars(sale_amount).map_err(ApiError::ValidationError)?;

    let outcome = sales::record_sale(
        state.store.as_ref(),
        &state.side_effects,
        RecordSaleInput {
            film_id,
            distributor_id,
            amount,
            holding_id: req.holding_id,
            referral_code: req.referral_code,
            buyer_email: req.buyer_email,
            payment_method: req.payment_method,
            payment_reference: req.payment_id,
        },
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(outcome, "Sale recorded and revenue distributed")),
    ))
}

/// GET /api/sales?filmId=..&distributorId=..
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SalesQuery>,
) -> Result<Json<ApiResponse<Vec<SaleRecord>>>, ApiError> {
    let sales = state
        .store
        .list_sales(&SaleFilter {
            film_id: query.film_id,
            distributor_id: query.distributor_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(sales)))
}

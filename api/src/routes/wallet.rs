//! Wallet Endpoints
//!
//! 커스터디 지갑 생성/조회. 암호화된 개인키는 응답에 포함되지 않는다.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{
    db::{PaymentTransaction, Wallet},
    error::ApiError,
    services::wallet::{create_wallet_for_user, KeyVault, USER_TYPES},
    types::ApiResponse,
    AppState,
};

/// 최근 거래 조회 개수
const TRANSACTION_LIMIT: i64 = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWalletRequest {
    pub user_id: Option<String>,
    pub user_type: Option<String>,
}

/// POST /api/wallet
///
/// 이미 지갑이 있으면 기존 지갑을 그대로 반환
pub async fn create_wallet(
    State(state): State<AppState>,
    Json(req): Json<CreateWalletRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Wallet>>), ApiError> {
    let user_id = req
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::ValidationError("userId is required".to_string()))?;
    let user_type = req.user_type.unwrap_or_else(|| "buyer".to_string());
    if !USER_TYPES.contains(&user_type.as_str()) {
        return Err(ApiError::ValidationError(format!("unknown userType {}", user_type)));
    }

    let vault = KeyVault::from_hex(state.config.wallet_encryption_key.as_deref())?;
    let wallet = create_wallet_for_user(state.store.as_ref(), &vault, &user_id, &user_type).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(wallet))))
}

/// GET /api/wallet/:user_id
pub async fn get_wallet(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Wallet>>, ApiError> {
    let wallet = state
        .store
        .get_wallet_for_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Wallet not found".to_string()))?;
    Ok(Json(ApiResponse::success(wallet)))
}

/// GET /api/wallet/:user_id/transactions
pub async fn list_transactions(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<ApiResponse<Vec<PaymentTransaction>>>, ApiError> {
    let transactions = state
        .store
        .list_payments_for_user(&user_id, TRANSACTION_LIMIT)
        .await?;
    Ok(Json(ApiResponse::success(transactions)))
}

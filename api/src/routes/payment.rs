//! Payment Endpoints
//!
//! KES -> 스테이블코인 결제 (Pretium).
//!
//! 웹훅은 raw body로 받는다. 서명이 원문 바이트에 대해 계산되므로
//! JSON으로 먼저 파싱하면 검증할 수 없다.

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    error::ApiError,
    services::{
        exchange_rate::ExchangeRate,
        payments::{self, CreateOrderInput, OrderCreated, WebhookOutcome},
        pretium::{kenyan_payment_methods, PaymentMethod, SIGNATURE_HEADER},
        wallet::KeyVault,
    },
    types::ApiResponse,
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequestBody {
    pub film_id: Option<i64>,
    pub amount_kes: Option<f64>,
    pub amount_usd: Option<f64>,
    pub stablecoin: Option<String>,
    pub payment_method: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookAck {
    pub success: bool,
    pub outcome: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sale_id: Option<i64>,
}

/// GET /api/payment/exchange-rate
pub async fn exchange_rate(State(state): State<AppState>) -> Json<ApiResponse<ExchangeRate>> {
    Json(ApiResponse::success(state.exchange_rates.kes_to_usd().await))
}

/// GET /api/payment/methods
pub async fn payment_methods() -> Json<ApiResponse<Vec<PaymentMethod>>> {
    Json(ApiResponse::success(kenyan_payment_methods()))
}

/// POST /api/payment/create-order
///
/// `amountUsd`는 선택값. 서버 환율 계산과 2% 넘게 다르면 400
pub async fn create_order(
    State(state): State<AppState>,
    Json(req): Json<CreateOrderRequestBody>,
) -> Result<(StatusCode, Json<ApiResponse<OrderCreated>>), ApiError> {
    let (Some(film_id), Some(amount_kes)) = (req.film_id, req.amount_kes) else {
        return Err(ApiError::ValidationError("filmId and amountKes are required".to_string()));
    };

    let vault = KeyVault::from_hex(state.config.wallet_encryption_key.as_deref())?;

    let order = payments::create_order(
        state.store.as_ref(),
        state.gateway.as_ref(),
        &state.exchange_rates,
        &vault,
        &state.config.app_url,
        CreateOrderInput {
            film_id,
            amount_kes,
            amount_usd: req.amount_usd,
            stablecoin: req.stablecoin,
            payment_method: req.payment_method,
            referral_code: req.referral_code,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(order))))
}

/// POST /api/payment/webhook/pretium
///
/// `x-pretium-signature` = hex(HMAC-SHA256(secret, body)). 틀리면 401, 변경 없음
pub async fn pretium_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());

    let outcome = payments::handle_webhook(
        state.store.as_ref(),
        &state.side_effects,
        &body,
        signature,
        state.config.pretium.webhook_secret.as_deref(),
    )
    .await?;

    let (label, sale_id) = match outcome {
        WebhookOutcome::Completed { sale_id } => ("completed", sale_id),
        WebhookOutcome::AlreadyCompleted => ("already_completed", None),
        WebhookOutcome::Failed => ("failed", None),
        WebhookOutcome::UnknownOrder => ("unknown_order", None),
        WebhookOutcome::Ignored(_) => ("ignored", None),
    };

    Ok(Json(WebhookAck {
        success: true,
        outcome: label,
        sale_id,
    }))
}

//! Pretium Payment Gateway
//!
//! KES(M-Pesa, 카드)로 결제하면 Base 네트워크에서 USDC/USDT를 받는 주문을 생성한다.
//! 완료 통지는 HMAC-SHA256 서명된 웹훅으로 들어온다.
//!
//! # Webhook Signature
//!
//! `x-pretium-signature` 헤더 = hex(HMAC-SHA256(secret, raw body))

use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// 웹훅 서명 헤더
pub const SIGNATURE_HEADER: &str = "x-pretium-signature";

/// 주문 생성 요청
#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderRequest {
    pub amount_kes: i64,
    pub stablecoin: String,
    pub wallet_address: String,
    pub payment_method: String,
    pub network: String,
    pub return_url: String,
    pub cancel_url: String,
}

/// 주문 생성 응답
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub payment_url: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// 웹훅 페이로드
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    pub order_id: String,
    pub status: String,
    #[serde(default)]
    pub blockchain_tx: Option<String>,
    #[serde(default)]
    pub stablecoin_amount: Option<f64>,
    #[serde(default)]
    pub wallet_address: Option<String>,
}

/// 결제 게이트웨이 인터페이스
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse>;
}

/// Pretium REST 클라이언트
pub struct PretiumClient {
    api_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl PretiumClient {
    pub fn new(api_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .context("failed to build Pretium HTTP client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }
}

#[async_trait]
impl PaymentGateway for PretiumClient {
    async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| anyhow!("PRETIUM_API_KEY not configured"))?;

        tracing::info!(
            amount_kes = request.amount_kes,
            stablecoin = %request.stablecoin,
            payment_method = %request.payment_method,
            "creating Pretium order"
        );

        let response = self
            .http
            .post(format!("{}/orders", self.api_url))
            .bearer_auth(api_key)
            .json(request)
            .send()
            .await
            .context("Pretium order request failed")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            bail!("Pretium order creation failed ({}): {}", status, body);
        }

        let order: CreateOrderResponse = response
            .json()
            .await
            .context("malformed Pretium order response")?;

        tracing::info!(order_id = %order.order_id, "Pretium order created");
        Ok(order)
    }
}

/// 웹훅 서명 생성 (hex)
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// 웹훅 서명 검증 (constant-time)
///
/// secret이 없거나 서명이 hex가 아니면 false
pub fn verify_webhook_signature(payload: &[u8], signature: &str, secret: Option<&str>) -> bool {
    let Some(secret) = secret.filter(|s| !s.is_empty()) else {
        tracing::error!("PRETIUM_WEBHOOK_SECRET not configured");
        return false;
    };

    let Ok(expected) = hex::decode(signature.trim()) else {
        return false;
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);
    mac.verify_slice(&expected).is_ok()
}

/// 결제 수단 안내
#[derive(Debug, Clone, Serialize)]
pub struct PaymentMethod {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub min_kes: u64,
    pub max_kes: u64,
    pub fees: &'static str,
}

/// 케냐 사용자용 결제 수단
pub fn kenyan_payment_methods() -> Vec<PaymentMethod> {
    vec![
        PaymentMethod {
            id: "mpesa",
            name: "M-Pesa",
            description: "Pay via M-Pesa",
            min_kes: 100,
            max_kes: 500_000,
            fees: "0%",
        },
        PaymentMethod {
            id: "credit_card",
            name: "Credit/Debit Card",
            description: "Visa, Mastercard",
            min_kes: 100,
            max_kes: 500_000,
            fees: "2.9% + KES 50",
        },
        PaymentMethod {
            id: "bank_transfer",
            name: "Bank Transfer",
            description: "Direct bank transfer",
            min_kes: 1_000,
            max_kes: 5_000_000,
            fees: "0.5%",
        },
    ]
}

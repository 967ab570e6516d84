//! Database Models
//!
//! Rows for films, applications, DDT holdings, sales and payments.
//! Money columns are BIGINT micro-USD (`UsdAmount`).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

use crate::types::{ApplicationKind, ApplicationStatus, UsdAmount};

/// 승인된 영화
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Film {
    pub id: i64,
    pub title: String,
    /// 판매 가격 (USD)
    pub price_usd: UsdAmount,
    pub approved: bool,
    /// 누적 판매액 (판매마다 가산)
    pub total_sales_value: UsdAmount,
    /// 영화를 만든 filmmaker 신청서
    pub filmmaker_application_id: Option<i64>,
    pub trailer_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// 신청서 (filmmaker / distributor)
///
/// distributor의 id는 신청서 id와 같다.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: i64,
    /// filmmaker | distributor
    pub kind: String,
    /// pending | approved | rejected
    pub status: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_name: Option<String>,
    pub country: Option<String>,
    pub wallet_address: Option<String>,
    pub film_title: Option<String>,
    pub film_price_usd: Option<UsdAmount>,
    /// 폼의 나머지 필드
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl Application {
    pub fn kind(&self) -> Option<ApplicationKind> {
        self.kind.parse().ok()
    }

    pub fn status(&self) -> Option<ApplicationStatus> {
        self.status.parse().ok()
    }

    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// 신청서 생성 입력
#[derive(Debug, Clone)]
pub struct NewApplication {
    pub kind: ApplicationKind,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub company_name: Option<String>,
    pub country: Option<String>,
    pub wallet_address: Option<String>,
    pub film_title: Option<String>,
    pub film_price_usd: Option<UsdAmount>,
    pub details: serde_json::Value,
}

/// 영화 생성 입력
#[derive(Debug, Clone)]
pub struct NewFilm {
    pub title: String,
    pub price_usd: UsdAmount,
    pub filmmaker_application_id: Option<i64>,
}

/// distributor의 영화별 DDT 보유 기록
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DistributorHolding {
    pub id: i64,
    pub distributor_id: i64,
    pub film_id: i64,
    pub ddt_balance: i64,
    pub referral_code: String,
    pub personalized_link: String,
    /// 이 링크로 발생한 누적 판매액
    pub sales_attributed: UsdAmount,
    /// 누적 distributor 수익 (판매액의 20%)
    pub earned_amount: UsdAmount,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHolding {
    pub distributor_id: i64,
    pub film_id: i64,
    pub referral_code: String,
    pub personalized_link: String,
}

/// 판매 기록 (append-only)
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRecord {
    pub id: i64,
    pub film_id: i64,
    pub distributor_id: i64,
    pub holding_id: Option<i64>,
    pub sale_amount: UsdAmount,
    pub buyer_email: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
    /// 온체인 기록 성공 시에만 설정
    pub transaction_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSale {
    pub film_id: i64,
    pub distributor_id: i64,
    pub holding_id: Option<i64>,
    pub sale_amount: UsdAmount,
    pub buyer_email: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
}

/// 판매 1건당 수익 분배 (70 / 20 / 10)
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenuePayout {
    pub sale_id: i64,
    pub film_id: i64,
    pub distributor_id: i64,
    pub filmmaker_share: UsdAmount,
    pub distributor_share: UsdAmount,
    pub platform_share: UsdAmount,
    pub total_sale_amount: UsdAmount,
}

/// 판매 조회 필터
#[derive(Debug, Clone, Default)]
pub struct SaleFilter {
    pub film_id: Option<i64>,
    pub distributor_id: Option<i64>,
}

/// Pretium 결제 주문
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentTransaction {
    pub id: i64,
    pub user_id: String,
    pub user_type: String,
    pub film_id: i64,
    /// 정수 실링 (올림)
    pub amount_kes: i64,
    pub amount_usd: UsdAmount,
    pub stablecoin: String,
    /// pending | completed | failed
    pub status: String,
    pub order_id: String,
    pub payment_method: String,
    pub referral_code: Option<String>,
    pub payment_url: Option<String>,
    pub blockchain_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: String,
    pub user_type: String,
    pub film_id: i64,
    pub amount_kes: i64,
    pub amount_usd: UsdAmount,
    pub stablecoin: String,
    pub order_id: String,
    pub payment_method: String,
    pub referral_code: Option<String>,
    pub payment_url: Option<String>,
}

/// 커스터디 지갑
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub user_type: String,
    pub wallet_address: String,
    /// `iv:ciphertext` (hex). 응답에 절대 포함하지 않음
    #[serde(skip_serializing)]
    pub encrypted_private_key: String,
    pub currency: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewWallet {
    pub user_id: String,
    pub user_type: String,
    pub wallet_address: String,
    pub encrypted_private_key: String,
}

/// 온체인 작업 기록
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: i64,
    /// SALE | ASSIGN | APPROVE_FILM
    pub operation_type: String,
    pub film_id: i64,
    pub distributor_id: Option<i64>,
    pub notes: String,
    pub transaction_hash: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub operation_type: String,
    pub film_id: i64,
    pub distributor_id: Option<i64>,
    pub notes: String,
    pub transaction_hash: String,
}

/// 재시도를 모두 소진한 side effect
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetter {
    pub id: i64,
    pub job_kind: String,
    pub payload: serde_json::Value,
    pub last_error: String,
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewDeadLetter {
    pub job_kind: String,
    pub payload: serde_json::Value,
    pub last_error: String,
    pub attempts: i32,
}

//! Repository Pattern Implementation
//!
//! 데이터 접근을 `MarketplaceStore` trait 뒤로 숨긴다.
//!
//! - PostgreSQL 구현: `db/mod.rs`의 `Database`
//! - 테스트 구현: 아래 `memory::MemoryStore`
//!
//! 판매 기록 흐름은 여러 개의 독립적인 쓰기로 이루어지므로
//! 각 메서드는 단일 statement로 끝나야 한다 (트랜잭션 없음).

use anyhow::Result;
use async_trait::async_trait;

use super::models::*;
use crate::types::{ApplicationKind, ApplicationStatus, UsdAmount};

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    async fn health_check(&self) -> Result<()>;

    // ============ Films ============
    async fn insert_film(&self, film: &NewFilm) -> Result<Film>;
    async fn get_film(&self, id: i64) -> Result<Option<Film>>;
    async fn find_film_by_application(&self, application_id: i64) -> Result<Option<Film>>;
    async fn list_approved_films(&self) -> Result<Vec<Film>>;
    /// `total_sales_value += amount`. 대상이 없으면 false
    async fn add_film_sales(&self, film_id: i64, amount: UsdAmount) -> Result<bool>;
    async fn set_trailer_url(&self, film_id: i64, url: &str) -> Result<bool>;

    // ============ Applications ============
    async fn insert_application(&self, application: &NewApplication) -> Result<Application>;
    async fn get_application(&self, id: i64) -> Result<Option<Application>>;
    async fn list_applications(&self, kind: ApplicationKind) -> Result<Vec<Application>>;
    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>>;

    // ============ DDT Holdings ============
    async fn insert_holding(&self, holding: &NewHolding) -> Result<DistributorHolding>;
    async fn get_holding(&self, id: i64) -> Result<Option<DistributorHolding>>;
    async fn find_holding(
        &self,
        distributor_id: i64,
        film_id: i64,
    ) -> Result<Option<DistributorHolding>>;
    async fn find_holding_by_referral(&self, code: &str) -> Result<Option<DistributorHolding>>;
    /// `sales_attributed += sales`, `earned_amount += earned`
    async fn increment_holding(
        &self,
        holding_id: i64,
        sales: UsdAmount,
        earned: UsdAmount,
    ) -> Result<bool>;

    // ============ Sales ============
    async fn insert_sale(&self, sale: &NewSale) -> Result<SaleRecord>;
    async fn insert_payout(&self, payout: &RevenuePayout) -> Result<()>;
    async fn set_sale_transaction_hash(&self, sale_id: i64, tx_hash: &str) -> Result<bool>;
    async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<SaleRecord>>;
    async fn insert_ledger_entry(&self, entry: &NewLedgerEntry) -> Result<()>;

    // ============ Payments ============
    async fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentTransaction>;
    async fn find_payment_by_order(&self, order_id: &str) -> Result<Option<PaymentTransaction>>;
    /// pending/failed -> completed 전이. 이미 completed면 None
    async fn complete_payment(
        &self,
        order_id: &str,
        blockchain_tx_hash: Option<&str>,
    ) -> Result<Option<PaymentTransaction>>;
    /// pending -> failed 전이
    async fn fail_payment(&self, order_id: &str) -> Result<bool>;
    async fn list_payments_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>>;

    // ============ Wallets ============
    async fn insert_wallet(&self, wallet: &NewWallet) -> Result<Wallet>;
    async fn get_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>>;

    // ============ Dead Letters ============
    async fn insert_dead_letter(&self, letter: &NewDeadLetter) -> Result<DeadLetter>;
    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>>;
}

//! Database Module
//!
//! PostgreSQL persistence for the marketplace.
//!
//! # Notes
//!
//! - 금액 컬럼은 전부 BIGINT micro-USD
//! - 누적 카운터는 `col = col + $1` 단일 statement로 가산 (read-modify-write 없음)
//! - 판매 기록 흐름 전체를 감싸는 트랜잭션은 없다. 각 단계가 독립적으로 커밋됨

mod models;
mod repository;

pub use models::*;
pub use repository::MarketplaceStore;

#[cfg(test)]
pub use repository::memory;

use anyhow::Result;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::types::{ApplicationKind, ApplicationStatus, PaymentStatus, UsdAmount};

const FILM_COLUMNS: &str = "id, title, price_usd, approved, total_sales_value, \
     filmmaker_application_id, trailer_url, created_at";

const APPLICATION_COLUMNS: &str = "id, kind, status, first_name, last_name, email, \
     company_name, country, wallet_address, film_title, film_price_usd, details, \
     created_at, decided_at";

const HOLDING_COLUMNS: &str = "id, distributor_id, film_id, ddt_balance, referral_code, \
     personalized_link, sales_attributed, earned_amount, active, created_at";

const SALE_COLUMNS: &str = "id, film_id, distributor_id, holding_id, sale_amount, \
     buyer_email, payment_method, payment_reference, transaction_hash, created_at";

const PAYMENT_COLUMNS: &str = "id, user_id, user_type, film_id, amount_kes, amount_usd, \
     stablecoin, status, order_id, payment_method, referral_code, payment_url, \
     blockchain_tx_hash, created_at, updated_at";

const WALLET_COLUMNS: &str = "id, user_id, user_type, wallet_address, encrypted_private_key, \
     currency, created_at";

const DEAD_LETTER_COLUMNS: &str = "id, job_kind, payload, last_error, attempts, created_at";

/// 데이터베이스 연결 및 쿼리 담당
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 데이터베이스 연결
    ///
    /// # Connection Pool Settings
    ///
    /// - max_connections: 10
    /// - min_connections: 1
    /// - acquire_timeout: 3초
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(std::time::Duration::from_secs(3))
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    /// 마이그레이션 실행
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl MarketplaceStore for Database {
    async fn health_check(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_film(&self, film: &NewFilm) -> Result<Film> {
        let row = sqlx::query_as::<_, Film>(&format!(
            r#"
            INSERT INTO films (title, price_usd, approved, filmmaker_application_id)
            VALUES ($1, $2, TRUE, $3)
            RETURNING {FILM_COLUMNS}
            "#
        ))
        .bind(&film.title)
        .bind(film.price_usd)
        .bind(film.filmmaker_application_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_film(&self, id: i64) -> Result<Option<Film>> {
        let film = sqlx::query_as::<_, Film>(&format!(
            "SELECT {FILM_COLUMNS} FROM films WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(film)
    }

    async fn find_film_by_application(&self, application_id: i64) -> Result<Option<Film>> {
        let film = sqlx::query_as::<_, Film>(&format!(
            "SELECT {FILM_COLUMNS} FROM films WHERE filmmaker_application_id = $1"
        ))
        .bind(application_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(film)
    }

    async fn list_approved_films(&self) -> Result<Vec<Film>> {
        let films = sqlx::query_as::<_, Film>(&format!(
            "SELECT {FILM_COLUMNS} FROM films WHERE approved = TRUE ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(films)
    }

    async fn add_film_sales(&self, film_id: i64, amount: UsdAmount) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE films SET total_sales_value = total_sales_value + $2 WHERE id = $1",
        )
        .bind(film_id)
        .bind(amount)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn set_trailer_url(&self, film_id: i64, url: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE films SET trailer_url = $2 WHERE id = $1")
            .bind(film_id)
            .bind(url)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_application(&self, application: &NewApplication) -> Result<Application> {
        let row = sqlx::query_as::<_, Application>(&format!(
            r#"
            INSERT INTO applications (
                kind, first_name, last_name, email, company_name, country,
                wallet_address, film_title, film_price_usd, details
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(application.kind.as_str())
        .bind(&application.first_name)
        .bind(&application.last_name)
        .bind(&application.email)
        .bind(&application.company_name)
        .bind(&application.country)
        .bind(&application.wallet_address)
        .bind(&application.film_title)
        .bind(application.film_price_usd)
        .bind(&application.details)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_application(&self, id: i64) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    async fn list_applications(&self, kind: ApplicationKind) -> Result<Vec<Application>> {
        let applications = sqlx::query_as::<_, Application>(&format!(
            "SELECT {APPLICATION_COLUMNS} FROM applications WHERE kind = $1 ORDER BY created_at DESC"
        ))
        .bind(kind.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    async fn set_application_status(
        &self,
        id: i64,
        status: ApplicationStatus,
    ) -> Result<Option<Application>> {
        let application = sqlx::query_as::<_, Application>(&format!(
            r#"
            UPDATE applications SET status = $2, decided_at = NOW()
            WHERE id = $1
            RETURNING {APPLICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(status.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(application)
    }

    async fn insert_holding(&self, holding: &NewHolding) -> Result<DistributorHolding> {
        let row = sqlx::query_as::<_, DistributorHolding>(&format!(
            r#"
            INSERT INTO ddt_holdings (
                distributor_id, film_id, ddt_balance, referral_code, personalized_link, active
            )
            VALUES ($1, $2, 1, $3, $4, TRUE)
            RETURNING {HOLDING_COLUMNS}
            "#
        ))
        .bind(holding.distributor_id)
        .bind(holding.film_id)
        .bind(&holding.referral_code)
        .bind(&holding.personalized_link)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_holding(&self, id: i64) -> Result<Option<DistributorHolding>> {
        let holding = sqlx::query_as::<_, DistributorHolding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM ddt_holdings WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(holding)
    }

    async fn find_holding(
        &self,
        distributor_id: i64,
        film_id: i64,
    ) -> Result<Option<DistributorHolding>> {
        let holding = sqlx::query_as::<_, DistributorHolding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM ddt_holdings WHERE distributor_id = $1 AND film_id = $2"
        ))
        .bind(distributor_id)
        .bind(film_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(holding)
    }

    async fn find_holding_by_referral(&self, code: &str) -> Result<Option<DistributorHolding>> {
        let holding = sqlx::query_as::<_, DistributorHolding>(&format!(
            "SELECT {HOLDING_COLUMNS} FROM ddt_holdings WHERE referral_code = $1"
        ))
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        Ok(holding)
    }

    async fn increment_holding(
        &self,
        holding_id: i64,
        sales: UsdAmount,
        earned: UsdAmount,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE ddt_holdings
            SET sales_attributed = sales_attributed + $2,
                earned_amount = earned_amount + $3
            WHERE id = $1
            "#,
        )
        .bind(holding_id)
        .bind(sales)
        .bind(earned)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_sale(&self, sale: &NewSale) -> Result<SaleRecord> {
        let row = sqlx::query_as::<_, SaleRecord>(&format!(
            r#"
            INSERT INTO sales_records (
                film_id, distributor_id, holding_id, sale_amount,
                buyer_email, payment_method, payment_reference
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {SALE_COLUMNS}
            "#
        ))
        .bind(sale.film_id)
        .bind(sale.distributor_id)
        .bind(sale.holding_id)
        .bind(sale.sale_amount)
        .bind(&sale.buyer_email)
        .bind(&sale.payment_method)
        .bind(&sale.payment_reference)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn insert_payout(&self, payout: &RevenuePayout) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO revenue_payouts (
                sale_id, film_id, distributor_id, filmmaker_share,
                distributor_share, platform_share, total_sale_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(payout.sale_id)
        .bind(payout.film_id)
        .bind(payout.distributor_id)
        .bind(payout.filmmaker_share)
        .bind(payout.distributor_share)
        .bind(payout.platform_share)
        .bind(payout.total_sale_amount)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_sale_transaction_hash(&self, sale_id: i64, tx_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE sales_records SET transaction_hash = $2 WHERE id = $1")
            .bind(sale_id)
            .bind(tx_hash)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_sales(&self, filter: &SaleFilter) -> Result<Vec<SaleRecord>> {
        // NULL 파라미터는 조건 없음으로 취급
        let sales = sqlx::query_as::<_, SaleRecord>(&format!(
            r#"
            SELECT {SALE_COLUMNS} FROM sales_records
            WHERE ($1::BIGINT IS NULL OR film_id = $1)
              AND ($2::BIGINT IS NULL OR distributor_id = $2)
            ORDER BY created_at DESC
            "#
        ))
        .bind(filter.film_id)
        .bind(filter.distributor_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    async fn insert_ledger_entry(&self, entry: &NewLedgerEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO ddt_ledger (operation_type, film_id, distributor_id, notes, transaction_hash)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(&entry.operation_type)
        .bind(entry.film_id)
        .bind(entry.distributor_id)
        .bind(&entry.notes)
        .bind(&entry.transaction_hash)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn insert_payment(&self, payment: &NewPayment) -> Result<PaymentTransaction> {
        let row = sqlx::query_as::<_, PaymentTransaction>(&format!(
            r#"
            INSERT INTO payment_transactions (
                user_id, user_type, film_id, amount_kes, amount_usd, stablecoin,
                status, order_id, payment_method, referral_code, payment_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(&payment.user_id)
        .bind(&payment.user_type)
        .bind(payment.film_id)
        .bind(payment.amount_kes)
        .bind(payment.amount_usd)
        .bind(&payment.stablecoin)
        .bind(PaymentStatus::Pending.as_str())
        .bind(&payment.order_id)
        .bind(&payment.payment_method)
        .bind(&payment.referral_code)
        .bind(&payment.payment_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_payment_by_order(&self, order_id: &str) -> Result<Option<PaymentTransaction>> {
        let payment = sqlx::query_as::<_, PaymentTransaction>(&format!(
            "SELECT {PAYMENT_COLUMNS} FROM payment_transactions WHERE order_id = $1"
        ))
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn complete_payment(
        &self,
        order_id: &str,
        blockchain_tx_hash: Option<&str>,
    ) -> Result<Option<PaymentTransaction>> {
        // 조건부 전이: 웹훅이 중복 전달돼도 한 번만 성공
        let payment = sqlx::query_as::<_, PaymentTransaction>(&format!(
            r#"
            UPDATE payment_transactions
            SET status = $2, blockchain_tx_hash = $3, updated_at = NOW()
            WHERE order_id = $1 AND status <> $2
            RETURNING {PAYMENT_COLUMNS}
            "#
        ))
        .bind(order_id)
        .bind(PaymentStatus::Completed.as_str())
        .bind(blockchain_tx_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn fail_payment(&self, order_id: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE payment_transactions SET status = $2, updated_at = NOW()
            WHERE order_id = $1 AND status = $3
            "#,
        )
        .bind(order_id)
        .bind(PaymentStatus::Failed.as_str())
        .bind(PaymentStatus::Pending.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_payments_for_user(
        &self,
        user_id: &str,
        limit: i64,
    ) -> Result<Vec<PaymentTransaction>> {
        let payments = sqlx::query_as::<_, PaymentTransaction>(&format!(
            r#"
            SELECT {PAYMENT_COLUMNS} FROM payment_transactions
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn insert_wallet(&self, wallet: &NewWallet) -> Result<Wallet> {
        let row = sqlx::query_as::<_, Wallet>(&format!(
            r#"
            INSERT INTO wallets (user_id, user_type, wallet_address, encrypted_private_key, currency)
            VALUES ($1, $2, $3, $4, 'KES')
            RETURNING {WALLET_COLUMNS}
            "#
        ))
        .bind(&wallet.user_id)
        .bind(&wallet.user_type)
        .bind(&wallet.wallet_address)
        .bind(&wallet.encrypted_private_key)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_wallet_for_user(&self, user_id: &str) -> Result<Option<Wallet>> {
        let wallet = sqlx::query_as::<_, Wallet>(&format!(
            "SELECT {WALLET_COLUMNS} FROM wallets WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(wallet)
    }

    async fn insert_dead_letter(&self, letter: &NewDeadLetter) -> Result<DeadLetter> {
        let row = sqlx::query_as::<_, DeadLetter>(&format!(
            r#"
            INSERT INTO dead_letters (job_kind, payload, last_error, attempts)
            VALUES ($1, $2, $3, $4)
            RETURNING {DEAD_LETTER_COLUMNS}
            "#
        ))
        .bind(&letter.job_kind)
        .bind(&letter.payload)
        .bind(&letter.last_error)
        .bind(letter.attempts)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn list_dead_letters(&self, limit: i64) -> Result<Vec<DeadLetter>> {
        let letters = sqlx::query_as::<_, DeadLetter>(&format!(
            "SELECT {DEAD_LETTER_COLUMNS} FROM dead_letters ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(letters)
    }
}

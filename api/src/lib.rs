//! Film Marketplace API Library
//!
//! # Overview
//!
//! 영화 배급 마켓플레이스 백엔드. 판매 정산(70/20/10 분배), distributor
//! referral 귀속, KES 결제, DDT 컨트랙트 기록을 담당한다.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                          API                              │
//! │                                                           │
//! │  ┌─────────┐  ┌──────────┐  ┌─────────┐  ┌─────────┐     │
//! │  │ Routes  │─▶│ Services │─▶│   DB    │  │  Types  │     │
//! │  └─────────┘  └────┬─────┘  └─────────┘  └─────────┘     │
//! │                    │ enqueue                              │
//! │              ┌─────▼──────────┐                           │
//! │              │ SideEffectWorker│                          │
//! │              └─────┬──────────┘                           │
//! └────────────────────┼──────────────────────────────────────┘
//!                      ▼
//!        DDT contract (Base)      Resend      Pretium
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 (정산, 승인, 결제, 외부 클라이언트)
//! - `db`: 데이터베이스 연동
//! - `types`: 공통 타입 정의

use std::sync::Arc;

pub mod config;
pub mod db;
pub mod error;
pub mod routes;
pub mod services;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use db::{Database, MarketplaceStore};
pub use error::ApiError;

use services::{BlobStorage, ExchangeRateProvider, PaymentGateway, SideEffectQueue};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MarketplaceStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub exchange_rates: Arc<ExchangeRateProvider>,
    pub blob: Arc<BlobStorage>,
    pub side_effects: SideEffectQueue,
    pub config: Arc<Config>,
}

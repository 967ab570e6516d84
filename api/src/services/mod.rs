//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `revenue`: 70/20/10 수익 분배
//! - `sales`: 판매 기록 (sale -> payout -> holding -> film -> chain)
//! - `approvals`: filmmaker / distributor 신청서 승인
//! - `payments`: Pretium 주문 생성, 웹훅 처리
//! - `side_effects`: 온체인 기록, 메일 발송 비동기 작업자
//! - `ledger`, `mailer`, `pretium`, `exchange_rate`, `blob`: 외부 시스템 클라이언트
//! - `wallet`: 커스터디 지갑

pub mod approvals;
pub mod blob;
pub mod exchange_rate;
pub mod ledger;
pub mod mailer;
pub mod payments;
pub mod pretium;
pub mod referral;
pub mod revenue;
pub mod sales;
pub mod side_effects;
pub mod wallet;

pub use blob::BlobStorage;
pub use exchange_rate::ExchangeRateProvider;
pub use ledger::{build_ledger, LedgerClient};
pub use mailer::{EmailSender, ResendMailer};
pub use pretium::{PaymentGateway, PretiumClient};
pub use revenue::{split_revenue, RevenueSplit};
pub use side_effects::{SideEffect, SideEffectQueue, SideEffectWorker};
pub use wallet::KeyVault;

//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/api/films/*` - 영화 조회, 트레일러 업로드
//! - `/api/applications/*` - 신청서 접수/조회
//! - `/api/admin/*` - 승인/거절, dead letter
//! - `/api/ddt/*`, `/api/referrals/*` - DDT holding, referral 코드
//! - `/api/sales/*` - 판매 기록
//! - `/api/payment/*` - 결제 주문, Pretium 웹훅
//! - `/api/wallet/*` - 커스터디 지갑

pub mod admin;
pub mod applications;
pub mod films;
pub mod health;
pub mod holdings;
pub mod payment;
pub mod sales;
pub mod wallet;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{config::Config, AppState};

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health
///
/// GET  /api/films                          GET  /api/films/:id
/// POST /api/films/:id/trailer              (multipart)
///
/// POST /api/applications/filmmaker         GET  /api/applications/filmmaker
/// POST /api/applications/distributor       GET  /api/applications/distributor
///
/// POST /api/admin/filmmakers/:id/approve
/// POST /api/admin/distributors/:id/approve {filmId}
/// POST /api/admin/applications/:id/reject
/// GET  /api/admin/dead-letters
///
/// GET  /api/ddt/holding?distributorId&filmId
/// GET  /api/referrals/:code
///
/// POST /api/sales/record-sale              GET  /api/sales?filmId&distributorId
///
/// GET  /api/payment/exchange-rate          GET  /api/payment/methods
/// POST /api/payment/create-order           POST /api/payment/webhook/pretium
///
/// POST /api/wallet                         GET  /api/wallet/:user_id
/// GET  /api/wallet/:user_id/transactions
/// ```
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Films
        .route("/api/films", get(films::list_films))
        .route("/api/films/:id", get(films::get_film))
        .route(
            "/api/films/:id/trailer",
            post(films::upload_trailer).layer(DefaultBodyLimit::max(films::TRAILER_MAX_BYTES)),
        )

        // Applications
        .route(
            "/api/applications/filmmaker",
            post(applications::submit_filmmaker).get(applications::list_filmmakers),
        )
        .route(
            "/api/applications/distributor",
            post(applications::submit_distributor).get(applications::list_distributors),
        )

        // Admin
        .route("/api/admin/filmmakers/:id/approve", post(admin::approve_filmmaker))
        .route("/api/admin/distributors/:id/approve", post(admin::approve_distributor))
        .route("/api/admin/applications/:id/reject", post(admin::reject_application))
        .route("/api/admin/dead-letters", get(admin::list_dead_letters))

        // DDT / referral
        .route("/api/ddt/holding", get(holdings::get_holding))
        .route("/api/referrals/:code", get(holdings::resolve_referral))

        // Sales
        .route("/api/sales", get(sales::list_sales))
        .route("/api/sales/record-sale", post(sales::record_sale))

        // Payment
        .route("/api/payment/exchange-rate", get(payment::exchange_rate))
        .route("/api/payment/methods", get(payment::payment_methods))
        .route("/api/payment/create-order", post(payment::create_order))
        .route("/api/payment/webhook/pretium", post(payment::pretium_webhook))

        // Wallet
        .route("/api/wallet", post(wallet::create_wallet))
        .route("/api/wallet/:user_id", get(wallet::get_wallet))
        .route("/api/wallet/:user_id/transactions", get(wallet::list_transactions))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}

/// CORS 설정
///
/// 프로덕션: `ALLOWED_ORIGINS`만 허용. 개발: localhost 허용
fn cors_layer(config: &Config) -> CorsLayer {
    if config.is_production() {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
    } else {
        CorsLayer::new()
            .allow_origin([
                HeaderValue::from_static("http://localhost:3000"), // Next.js dev server
                HeaderValue::from_static("http://localhost:5173"),
                HeaderValue::from_static("http://127.0.0.1:3000"),
            ])
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

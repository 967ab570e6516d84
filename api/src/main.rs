//! Film Marketplace API Server
//!
//! # Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Client (Next.js frontend)                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Axum Web Server                         │
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                      Routes Layer                        ││
//! │  │  /films  /applications  /admin  /sales  /payment        ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Services Layer                        ││
//! │  │  Sales    Approvals    Payments    SideEffectWorker     ││
//! │  └─────────────────────────────────────────────────────────┘│
//! │  ┌─────────────────────────────────────────────────────────┐│
//! │  │                    Data Layer                            ││
//! │  │  PostgreSQL (MarketplaceStore)                          ││
//! │  └─────────────────────────────────────────────────────────┘│
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   DDT contract (Base)    Pretium    Resend    Blob storage   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use film_market_api::{
    routes,
    services::{
        build_ledger, BlobStorage, ExchangeRateProvider, PretiumClient, ResendMailer,
        SideEffectQueue, SideEffectWorker,
    },
    AppState, Config, Database, MarketplaceStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 환경변수 로드
    dotenvy::dotenv().ok();

    // 로깅 초기화
    // RUST_LOG=debug,sqlx=warn 형태로 레벨 제어 가능
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "film_market_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("🚀 Starting Film Marketplace API Server");

    // 설정 로드
    let config = Config::from_env()?;
    tracing::info!(environment = ?config.environment, "📋 Configuration loaded");

    // 데이터베이스 연결
    let db = Database::connect(&config.database_url).await?;
    tracing::info!("🗄️  Database connected");

    // 마이그레이션 실행
    db.run_migrations().await?;
    tracing::info!("📦 Migrations completed");

    let store: Arc<dyn MarketplaceStore> = Arc::new(db);

    // 비동기 side effect 작업자 (온체인 기록, 메일)
    let ledger = build_ledger(&config.chain);
    let mailer = Arc::new(ResendMailer::new(&config.email)?);
    let (side_effects, jobs) =
        SideEffectQueue::channel(store.clone(), config.side_effects.queue_capacity);
    let worker = SideEffectWorker::new(
        store.clone(),
        ledger,
        mailer,
        config.side_effects.clone(),
    );
    tokio::spawn(worker.run(jobs));
    tracing::info!("⛓️  Side effect worker started");

    // 외부 서비스 클라이언트
    let gateway = Arc::new(PretiumClient::new(
        &config.pretium.api_url,
        config.pretium.api_key.clone(),
    )?);
    let exchange_rates = Arc::new(ExchangeRateProvider::new(
        &config.pretium.api_url,
        config.pretium.api_key.clone(),
    )?);
    let blob = Arc::new(BlobStorage::new(&config.blob)?);
    if config.pretium.webhook_secret.is_none() {
        tracing::warn!("PRETIUM_WEBHOOK_SECRET not set, all webhooks will be rejected");
    }

    // 앱 상태 구성
    let state = AppState {
        store,
        gateway,
        exchange_rates,
        blob,
        side_effects,
        config: Arc::new(config.clone()),
    };

    // 라우터 구성
    let app = routes::create_router(state);

    // 서버 시작
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🌐 Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

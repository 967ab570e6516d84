//! Payment Flow
//!
//! KES 결제 주문 생성과 Pretium 웹훅 처리.
//!
//! 웹훅 `completed`는 결제 상태를 조건부로 전이시키고(`status <> 'completed'`),
//! 전이가 실제로 일어난 첫 번째 통지에서만 판매를 기록한다.
//!
//! USD 금액은 서버가 `amount_kes × rate`로 계산한다. 클라이언트가 보낸 값은
//! 검증에만 쓰고, 판매 금액은 게이트웨이가 확인한 `stablecoin_amount`를 우선한다.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use super::exchange_rate::{kes_to_usd, ExchangeRateProvider};
use super::pretium::{
    kenyan_payment_methods, verify_webhook_signature, CreateOrderRequest, PaymentGateway,
    WebhookPayload,
};
use super::referral::normalize_referral;
use super::sales::{record_sale, RecordSaleInput};
use super::side_effects::SideEffectQueue;
use super::wallet::{create_wallet_for_user, KeyVault};
use crate::db::{MarketplaceStore, NewPayment, PaymentTransaction};
use crate::types::UsdAmount;

const SUPPORTED_STABLECOINS: &[&str] = &["USDC", "USDT"];
const SETTLEMENT_NETWORK: &str = "base";
/// 클라이언트 amountUsd와 서버 계산값의 허용 오차 (상대값)
const CLIENT_AMOUNT_TOLERANCE: f64 = 0.02;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("{0}")]
    Invalid(String),

    #[error("Film {0} not found")]
    FilmNotFound(i64),

    #[error("Invalid signature")]
    InvalidSignature,

    #[error("Malformed webhook payload: {0}")]
    MalformedPayload(String),

    #[error("payment gateway error: {0}")]
    Gateway(anyhow::Error),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct CreateOrderInput {
    pub film_id: i64,
    pub amount_kes: f64,
    pub amount_usd: Option<f64>,
    pub stablecoin: Option<String>,
    pub payment_method: Option<String>,
    pub referral_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: String,
    pub payment_url: String,
    /// 결제 레코드 저장에 실패하면 None
    pub transaction_id: Option<i64>,
    pub amount_kes: i64,
    pub amount_usd: UsdAmount,
}

/// 웹훅 처리 결과
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// 첫 완료 통지. 판매가 기록됐으면 sale id
    Completed { sale_id: Option<i64> },
    /// 이미 완료된 주문의 재전송
    AlreadyCompleted,
    Failed,
    UnknownOrder,
    Ignored(String),
}

pub async fn create_order(
    store: &dyn MarketplaceStore,
    gateway: &dyn PaymentGateway,
    rates: &ExchangeRateProvider,
    vault: &KeyVault,
    app_url: &str,
    input: CreateOrderInput,
) -> Result<OrderCreated, PaymentError> {
    if !input.amount_kes.is_finite() || input.amount_kes <= 0.0 {
        return Err(PaymentError::Invalid("amountKes must be positive".into()));
    }

    let stablecoin = input
        .stablecoin
        .as_deref()
        .unwrap_or("USDC")
        .to_uppercase();
    if !SUPPORTED_STABLECOINS.contains(&stablecoin.as_str()) {
        return Err(PaymentError::Invalid(format!("unsupported stablecoin {}", stablecoin)));
    }

    // 정수 실링으로 올림
    let amount_kes = input.amount_kes.ceil() as i64;

    let payment_method = input.payment_method.clone().unwrap_or_else(|| "mpesa".to_string());
    let method = kenyan_payment_methods()
        .into_iter()
        .find(|m| m.id == payment_method)
        .ok_or_else(|| PaymentError::Invalid(format!("unsupported payment method {}", payment_method)))?;
    if amount_kes < method.min_kes as i64 || amount_kes > method.max_kes as i64 {
        return Err(PaymentError::Invalid(format!(
            "{} accepts KES {} to {}",
            method.name, method.min_kes, method.max_kes
        )));
    }

    if store.get_film(input.film_id).await?.is_none() {
        return Err(PaymentError::FilmNotFound(input.film_id));
    }

    let rate = rates.kes_to_usd().await;
    let amount_usd = UsdAmount::from_dollars(kes_to_usd(amount_kes as f64, Some(rate.rate)))
        .map_err(PaymentError::Invalid)?;
    if !amount_usd.is_positive() {
        return Err(PaymentError::Invalid("amountUsd must be positive".into()));
    }
    if let Some(client_usd) = input.amount_usd {
        check_client_amount(client_usd, amount_usd)?;
    }

    // 구매자마다 임시 id / 수령 지갑. 개인키는 암호화해 보관
    let buyer_id = format!("buyer_{}", Uuid::new_v4().simple());
    let buyer_wallet = create_wallet_for_user(store, vault, &buyer_id, "buyer").await?;

    let order = gateway
        .create_order(&CreateOrderRequest {
            amount_kes,
            stablecoin: stablecoin.clone(),
            wallet_address: buyer_wallet.wallet_address,
            payment_method: payment_method.clone(),
            network: SETTLEMENT_NETWORK.to_string(),
            return_url: format!("{}/payment/success", app_url.trim_end_matches('/')),
            cancel_url: format!("{}/payment/cancel", app_url.trim_end_matches('/')),
        })
        .await
        .map_err(PaymentError::Gateway)?;

    let transaction_id = match store
        .insert_payment(&NewPayment {
            user_id: buyer_id,
            user_type: "buyer".to_string(),
            film_id: input.film_id,
            amount_kes,
            amount_usd,
            stablecoin,
            order_id: order.order_id.clone(),
            payment_method,
            referral_code: input.referral_code.as_deref().and_then(normalize_referral),
            payment_url: Some(order.payment_url.clone()),
        })
        .await
    {
        Ok(tx) => Some(tx.id),
        Err(e) => {
            tracing::error!(order_id = %order.order_id, error = %e, "failed to store payment transaction");
            None
        }
    };

    tracing::info!(
        order_id = %order.order_id,
        film_id = input.film_id,
        amount_kes,
        amount_usd = %amount_usd,
        "payment order created"
    );

    Ok(OrderCreated {
        order_id: order.order_id,
        payment_url: order.payment_url,
        transaction_id,
        amount_kes,
        amount_usd,
    })
}

/// 클라이언트가 화면에 보여준 USD 금액이 서버 환율 계산과 크게 다르면 거부
fn check_client_amount(client_usd: f64, server: UsdAmount) -> Result<(), PaymentError> {
    let client = UsdAmount::from_dollars(client_usd).map_err(PaymentError::Invalid)?;
    let expected = server.to_dollars();
    if (client.to_dollars() - expected).abs() > expected * CLIENT_AMOUNT_TOLERANCE {
        return Err(PaymentError::Invalid(format!(
            "amountUsd {} does not match amountKes at the current rate ({})",
            client, server
        )));
    }
    Ok(())
}

/// 서명 검증 후 웹훅 처리
///
/// 서명이 틀리면 아무것도 변경하지 않는다.
pub async fn handle_webhook(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    raw_body: &[u8],
    signature: Option<&str>,
    secret: Option<&str>,
) -> Result<WebhookOutcome, PaymentError> {
    let signature = signature.ok_or(PaymentError::InvalidSignature)?;
    if !verify_webhook_signature(raw_body, signature, secret) {
        tracing::warn!("invalid Pretium webhook signature");
        return Err(PaymentError::InvalidSignature);
    }

    let payload: WebhookPayload = serde_json::from_slice(raw_body)
        .map_err(|e| PaymentError::MalformedPayload(e.to_string()))?;

    tracing::info!(order_id = %payload.order_id, status = %payload.status, "Pretium webhook received");

    match payload.status.as_str() {
        "completed" => {
            let completed = store
                .complete_payment(&payload.order_id, payload.blockchain_tx.as_deref())
                .await?;

            match completed {
                Some(payment) => {
                    let amount = settled_amount(&payment, payload.stablecoin_amount);
                    let sale_id = record_completed_sale(store, queue, &payment, amount).await;
                    Ok(WebhookOutcome::Completed { sale_id })
                }
                None => match store.find_payment_by_order(&payload.order_id).await? {
                    Some(_) => {
                        tracing::info!(order_id = %payload.order_id, "duplicate completion ignored");
                        Ok(WebhookOutcome::AlreadyCompleted)
                    }
                    None => {
                        tracing::warn!(order_id = %payload.order_id, "webhook for unknown order");
                        Ok(WebhookOutcome::UnknownOrder)
                    }
                },
            }
        }
        "failed" => {
            if store.fail_payment(&payload.order_id).await? {
                tracing::info!(order_id = %payload.order_id, "payment failed");
                Ok(WebhookOutcome::Failed)
            } else {
                tracing::warn!(order_id = %payload.order_id, "no pending payment to fail");
                Ok(WebhookOutcome::UnknownOrder)
            }
        }
        other => {
            tracing::info!(order_id = %payload.order_id, status = other, "webhook status acknowledged");
            Ok(WebhookOutcome::Ignored(other.to_string()))
        }
    }
}

/// 실제 정산 금액: 게이트웨이가 확인한 stablecoin 수량, 없으면 주문 시 계산값
fn settled_amount(payment: &PaymentTransaction, confirmed: Option<f64>) -> UsdAmount {
    let Some(confirmed) = confirmed else {
        return payment.amount_usd;
    };
    match UsdAmount::from_dollars(confirmed) {
        Ok(amount) if amount.is_positive() => {
            if amount != payment.amount_usd {
                tracing::info!(
                    order_id = %payment.order_id,
                    quoted = %payment.amount_usd,
                    settled = %amount,
                    "settled amount differs from quote"
                );
            }
            amount
        }
        _ => {
            tracing::warn!(order_id = %payment.order_id, confirmed, "ignoring invalid stablecoin_amount");
            payment.amount_usd
        }
    }
}

/// 완료된 결제를 referral holding에 귀속시켜 판매로 기록
///
/// 귀속할 distributor가 없으면 기록하지 않는다. 실패해도 웹훅은 성공 처리
async fn record_completed_sale(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    payment: &PaymentTransaction,
    amount: UsdAmount,
) -> Option<i64> {
    let Some(code) = payment.referral_code.as_deref() else {
        tracing::info!(order_id = %payment.order_id, "payment has no referral code, no distributor sale recorded");
        return None;
    };

    let holding = match store.find_holding_by_referral(code).await {
        Ok(Some(h)) if h.film_id == payment.film_id => h,
        Ok(_) => {
            tracing::warn!(order_id = %payment.order_id, code, "referral code does not match a holding for this film");
            return None;
        }
        Err(e) => {
            tracing::error!(order_id = %payment.order_id, error = %e, "referral lookup failed");
            return None;
        }
    };

    let input = RecordSaleInput {
        film_id: payment.film_id,
        distributor_id: holding.distributor_id,
        amount,
        holding_id: Some(holding.id),
        referral_code: None,
        buyer_email: None,
        payment_method: Some(payment.payment_method.clone()),
        payment_reference: Some(payment.order_id.clone()),
    };

    match record_sale(store, queue, input).await {
        Ok(outcome) => Some(outcome.sale.id),
        Err(e) => {
            tracing::error!(order_id = %payment.order_id, error = %e, "failed to record sale for completed payment");
            None
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Mutex;

    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::services::pretium::{CreateOrderRequest, CreateOrderResponse, PaymentGateway};

    /// 요청을 기록하고 고정 주문을 반환하는 게이트웨이
    #[derive(Default)]
    pub struct StubGateway {
        pub requests: Mutex<Vec<CreateOrderRequest>>,
        pub fail: bool,
    }

    #[async_trait]
    impl PaymentGateway for StubGateway {
        async fn create_order(&self, request: &CreateOrderRequest) -> Result<CreateOrderResponse> {
            if self.fail {
                bail!("gateway unavailable");
            }
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            Ok(CreateOrderResponse {
                order_id: format!("ord_{}", requests.len()),
                payment_url: format!("https://pay.example/ord_{}", requests.len()),
                status: Some("pending".into()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ethers::signers::{LocalWallet, Signer};
    use ethers::utils::to_checksum;

    use super::testing::StubGateway;
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::db::{NewFilm, NewHolding};
    use crate::services::pretium::sign_payload;

    const SECRET: &str = "whsec_test";

    async fn seed(store: &MemoryStore) -> i64 {
        let film = store
            .insert_film(&NewFilm {
                title: "Kati Kati".into(),
                price_usd: UsdAmount::from_micros(9_990_000),
                filmmaker_application_id: None,
            })
            .await
            .unwrap();
        store
            .insert_holding(&NewHolding {
                distributor_id: 7,
                film_id: film.id,
                referral_code: "ref-7".into(),
                personalized_link: "http://localhost:3000/films?ref=ref-7".into(),
            })
            .await
            .unwrap();
        film.id
    }

    fn offline_rates() -> ExchangeRateProvider {
        ExchangeRateProvider::new("http://127.0.0.1:1", None).unwrap()
    }

    fn vault() -> KeyVault {
        KeyVault::from_hex(Some(&"11".repeat(32))).unwrap()
    }

    async fn order(store: &MemoryStore, input: CreateOrderInput) -> Result<OrderCreated, PaymentError> {
        create_order(
            store,
            &StubGateway::default(),
            &offline_rates(),
            &vault(),
            "http://localhost:3000",
            input,
        )
        .await
    }

    fn completed(order_id: &str, stablecoin_amount: Option<f64>) -> (String, String) {
        let mut body = serde_json::json!({
            "order_id": order_id,
            "status": "completed",
            "blockchain_tx": "0xabc",
        });
        if let Some(amount) = stablecoin_amount {
            body["stablecoin_amount"] = serde_json::json!(amount);
        }
        let body = body.to_string();
        let signature = sign_payload(body.as_bytes(), SECRET);
        (body, signature)
    }

    #[tokio::test]
    async fn test_create_order_rounds_and_converts() {
        let store = MemoryStore::new();
        let film_id = seed(&store).await;
        let gateway = StubGateway::default();
        let vault = vault();

        let order = create_order(
            &store,
            &gateway,
            &offline_rates(),
            &vault,
            "http://localhost:3000",
            CreateOrderInput {
                film_id,
                amount_kes: 1299.2,
                referral_code: Some("ref-7".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(order.amount_kes, 1300);
        // fallback 0.0077 -> 10.01 USD
        assert_eq!(order.amount_usd, UsdAmount::from_micros(10_010_000));
        assert!(order.transaction_id.is_some());

        let request = gateway.requests.lock().unwrap()[0].clone();
        assert_eq!(request.network, "base");
        assert_eq!(request.stablecoin, "USDC");
        assert_eq!(request.return_url, "http://localhost:3000/payment/success");

        let payment = &store.payments()[0];
        assert_eq!(payment.status, "pending");
        assert!(payment.user_id.starts_with("buyer_"));

        // 수령 지갑은 구매자 id로 저장되고 개인키로 같은 주소가 복원된다
        let wallets = store.wallets();
        assert_eq!(wallets.len(), 1);
        assert_eq!(wallets[0].user_id, payment.user_id);
        assert_eq!(wallets[0].user_type, "buyer");
        assert_eq!(wallets[0].wallet_address, request.wallet_address);
        let key: LocalWallet = vault.decrypt(&wallets[0].encrypted_private_key).unwrap().parse().unwrap();
        assert_eq!(to_checksum(&key.address(), None), request.wallet_address);
    }

    #[tokio::test]
    async fn test_create_order_validation() {
        let store = MemoryStore::new();
        let film_id = seed(&store).await;
        let gateway = StubGateway::default();

        let invalid_inputs = [
            CreateOrderInput { film_id, amount_kes: 0.0, ..Default::default() },
            // M-Pesa 최소 100
            CreateOrderInput { film_id, amount_kes: 50.0, ..Default::default() },
            // M-Pesa 최대 500,000
            CreateOrderInput { film_id, amount_kes: 600_000.0, ..Default::default() },
            // 은행 송금 최소 1,000
            CreateOrderInput {
                film_id,
                amount_kes: 500.0,
                payment_method: Some("bank_transfer".into()),
                ..Default::default()
            },
            CreateOrderInput {
                film_id,
                amount_kes: 500.0,
                payment_method: Some("paypal".into()),
                ..Default::default()
            },
            CreateOrderInput {
                film_id,
                amount_kes: 500.0,
                stablecoin: Some("DAI".into()),
                ..Default::default()
            },
        ];
        for input in invalid_inputs {
            let err = create_order(&store, &gateway, &offline_rates(), &vault(), "http://x", input)
                .await
                .unwrap_err();
            assert!(matches!(err, PaymentError::Invalid(_)));
        }
        assert!(gateway.requests.lock().unwrap().is_empty());

        let err = create_order(&store, &gateway, &offline_rates(), &vault(), "http://x", CreateOrderInput {
            film_id: 999,
            amount_kes: 100.0,
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PaymentError::FilmNotFound(999)));

        let failing = StubGateway {
            fail: true,
            ..StubGateway::default()
        };
        let err = create_order(&store, &failing, &offline_rates(), &vault(), "http://x", CreateOrderInput {
            film_id,
            amount_kes: 100.0,
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PaymentError::Gateway(_)));
        assert!(store.payments().is_empty());
    }

    #[tokio::test]
    async fn test_client_usd_amount_is_checked_not_trusted() {
        let store = MemoryStore::new();
        let film_id = seed(&store).await;

        // 100 KES로 $10,000 판매를 주장
        let err = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 100.0,
            amount_usd: Some(10_000.0),
            referral_code: Some("ref-7".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();
        assert!(matches!(err, PaymentError::Invalid(_)));
        assert!(store.payments().is_empty());

        // 허용 오차 안의 값은 통과하지만 저장 금액은 서버 계산값
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 1300.0,
            amount_usd: Some(10.0),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(created.amount_usd, UsdAmount::from_micros(10_010_000));
        assert_eq!(store.payments()[0].amount_usd, UsdAmount::from_micros(10_010_000));
    }

    #[tokio::test]
    async fn test_webhook_credits_confirmed_amount() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let film_id = seed(&store).await;
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 100.0,
            referral_code: Some("ref-7".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        assert_eq!(created.amount_usd, UsdAmount::from_micros(770_000));

        let (body, signature) = completed(&created.order_id, Some(0.75));
        let outcome = handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&signature), Some(SECRET))
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Completed { sale_id: Some(_) }));

        assert_eq!(store.sales()[0].sale_amount, UsdAmount::from_micros(750_000));
        assert_eq!(store.holdings()[0].earned_amount, UsdAmount::from_micros(150_000));
    }

    #[tokio::test]
    async fn test_webhook_without_confirmed_amount_uses_quote() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let film_id = seed(&store).await;
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 100.0,
            referral_code: Some("http://localhost:3000/films?ref=ref-7".into()),
            ..Default::default()
        })
        .await
        .unwrap();
        // 링크로 보낸 referral도 코드로 저장
        assert_eq!(store.payments()[0].referral_code.as_deref(), Some("ref-7"));

        let (body, signature) = completed(&created.order_id, None);
        handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&signature), Some(SECRET))
            .await
            .unwrap();

        assert_eq!(store.sales()[0].sale_amount, UsdAmount::from_micros(770_000));
        assert_eq!(store.holdings()[0].earned_amount, UsdAmount::from_micros(154_000));
    }

    #[tokio::test]
    async fn test_webhook_redelivery_records_one_sale() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let film_id = seed(&store).await;
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 1300.0,
            referral_code: Some("ref-7".into()),
            ..Default::default()
        })
        .await
        .unwrap();

        let (body, signature) = completed(&created.order_id, Some(10.01));

        let first = handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&signature), Some(SECRET))
            .await
            .unwrap();
        assert!(matches!(first, WebhookOutcome::Completed { sale_id: Some(_) }));

        let second = handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&signature), Some(SECRET))
            .await
            .unwrap();
        assert_eq!(second, WebhookOutcome::AlreadyCompleted);

        assert_eq!(store.sales().len(), 1);
        assert_eq!(store.sales()[0].distributor_id, 7);
        assert_eq!(store.sales()[0].sale_amount, UsdAmount::from_micros(10_010_000));
        assert_eq!(store.holdings()[0].earned_amount, UsdAmount::from_micros(2_002_000));
        assert_eq!(store.payments()[0].blockchain_tx_hash.as_deref(), Some("0xabc"));
    }

    #[tokio::test]
    async fn test_invalid_signature_mutates_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let film_id = seed(&store).await;
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 1300.0,
            ..Default::default()
        })
        .await
        .unwrap();

        let body = serde_json::json!({ "order_id": created.order_id, "status": "completed" }).to_string();
        let forged = sign_payload(body.as_bytes(), "wrong-secret");

        for signature in [Some(forged.as_str()), None] {
            let err = handle_webhook(store.as_ref(), &queue, body.as_bytes(), signature, Some(SECRET))
                .await
                .unwrap_err();
            assert!(matches!(err, PaymentError::InvalidSignature));
        }

        // secret 미설정도 거부
        let valid = sign_payload(body.as_bytes(), SECRET);
        let err = handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&valid), None)
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::InvalidSignature));

        assert_eq!(store.payments()[0].status, "pending");
        assert!(store.sales().is_empty());
    }

    #[tokio::test]
    async fn test_failed_status_and_malformed_body() {
        let store = Arc::new(MemoryStore::new());
        let (queue, _rx) = SideEffectQueue::channel(store.clone(), 16);
        let film_id = seed(&store).await;
        let created = order(&store, CreateOrderInput {
            film_id,
            amount_kes: 500.0,
            ..Default::default()
        })
        .await
        .unwrap();

        let body = serde_json::json!({ "order_id": created.order_id, "status": "failed" }).to_string();
        let signature = sign_payload(body.as_bytes(), SECRET);
        let outcome = handle_webhook(store.as_ref(), &queue, body.as_bytes(), Some(&signature), Some(SECRET))
            .await
            .unwrap();
        assert_eq!(outcome, WebhookOutcome::Failed);
        assert_eq!(store.payments()[0].status, "failed");

        let body = b"not json";
        let signature = sign_payload(body, SECRET);
        let err = handle_webhook(store.as_ref(), &queue, body, Some(&signature), Some(SECRET))
            .await
            .unwrap_err();
        assert!(matches!(err, PaymentError::MalformedPayload(_)));
    }
}

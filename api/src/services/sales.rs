//! Sale Recorder
//!
//! 판매 1건 기록 순서:
//!
//! 0. holding_id를 명시했으면 같은 영화/distributor의 holding인지 확인 (아니면 400)
//! 1. sale record 저장 (실패하면 여기서 중단)
//! 2. payout record 저장
//! 3. holding 카운터 증가 (`sales_attributed += amount`, `earned_amount += distributor share`)
//! 4. 영화 누적 판매액 증가
//! 5. 온체인 기록 작업을 큐에 넣음
//!
//! 2~4는 서로 독립적이고 실패해도 로그만 남긴다 (이전 단계를 되돌리지 않음).

use serde::Serialize;
use thiserror::Error;

use super::referral::normalize_referral;
use super::revenue::{split_revenue, RevenueSplit};
use super::side_effects::{SideEffect, SideEffectQueue};
use crate::db::{MarketplaceStore, NewSale, RevenuePayout, SaleRecord};
use crate::types::UsdAmount;

#[derive(Debug, Error)]
pub enum SaleError {
    #[error("{0}")]
    InvalidAmount(String),

    #[error("Film {0} not found")]
    FilmNotFound(i64),

    #[error("Holding {0} does not belong to this film and distributor")]
    HoldingMismatch(i64),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default)]
pub struct RecordSaleInput {
    pub film_id: i64,
    pub distributor_id: i64,
    pub amount: UsdAmount,
    pub holding_id: Option<i64>,
    /// holding_id가 없을 때 holding을 찾는 데 사용 (코드 또는 개인 링크)
    pub referral_code: Option<String>,
    pub buyer_email: Option<String>,
    pub payment_method: Option<String>,
    pub payment_reference: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleOutcome {
    pub sale: SaleRecord,
    pub split: RevenueSplit,
}

pub async fn record_sale(
    store: &dyn MarketplaceStore,
    queue: &SideEffectQueue,
    input: RecordSaleInput,
) -> Result<SaleOutcome, SaleError> {
    let split = split_revenue(input.amount).map_err(|e| SaleError::InvalidAmount(e.to_string()))?;

    if store.get_film(input.film_id).await?.is_none() {
        return Err(SaleError::FilmNotFound(input.film_id));
    }

    let holding_id = match input.holding_id {
        // 명시한 holding도 referral과 같은 기준으로 검사
        Some(id) => match store.get_holding(id).await? {
            Some(h) if h.film_id == input.film_id && h.distributor_id == input.distributor_id => Some(h.id),
            _ => return Err(SaleError::HoldingMismatch(id)),
        },
        None => match input.referral_code.as_deref().and_then(normalize_referral) {
            Some(code) => resolve_referral(store, &code, input.film_id, input.distributor_id).await,
            None => None,
        },
    };

    // 1. sale record
    let sale = store
        .insert_sale(&NewSale {
            film_id: input.film_id,
            distributor_id: input.distributor_id,
            holding_id,
            sale_amount: input.amount,
            buyer_email: input.buyer_email,
            payment_method: input.payment_method,
            payment_reference: input.payment_reference,
        })
        .await?;

    // 2. payout
    let payout = RevenuePayout {
        sale_id: sale.id,
        film_id: sale.film_id,
        distributor_id: sale.distributor_id,
        filmmaker_share: split.filmmaker_share,
        distributor_share: split.distributor_share,
        platform_share: split.platform_share,
        total_sale_amount: input.amount,
    };
    if let Err(e) = store.insert_payout(&payout).await {
        tracing::error!(sale_id = sale.id, error = %e, "failed to record revenue payout");
    }

    // 3. holding
    if let Some(holding_id) = holding_id {
        match store
            .increment_holding(holding_id, input.amount, split.distributor_share)
            .await
        {
            Ok(true) => {}
            Ok(false) => tracing::warn!(sale_id = sale.id, holding_id, "holding not found, earnings not credited"),
            Err(e) => tracing::error!(sale_id = sale.id, holding_id, error = %e, "failed to update holding"),
        }
    }

    // 4. film total
    if let Err(e) = store.add_film_sales(sale.film_id, input.amount).await {
        tracing::error!(sale_id = sale.id, film_id = sale.film_id, error = %e, "failed to update film sales total");
    }

    // 5. on-chain
    queue
        .enqueue(SideEffect::RecordSale {
            sale_id: sale.id,
            film_id: sale.film_id,
            distributor_id: sale.distributor_id,
            amount: input.amount,
        })
        .await;

    tracing::info!(
        sale_id = sale.id,
        film_id = sale.film_id,
        distributor_id = sale.distributor_id,
        amount = %input.amount,
        filmmaker_share = %split.filmmaker_share,
        distributor_share = %split.distributor_share,
        platform_share = %split.platform_share,
        "sale recorded"
    );

    Ok(SaleOutcome { sale, split })
}

/// referral code -> holding id (같은 영화/distributor일 때만)
async fn resolve_referral(
    store: &dyn MarketplaceStore,
    code: &str,
    film_id: i64,
    distributor_id: i64,
) -> Option<i64> {
    match store.find_holding_by_referral(code).await {
        Ok(Some(h)) if h.film_id == film_id && h.distributor_id == distributor_id => Some(h.id),
        Ok(Some(h)) => {
            tracing::warn!(
                code,
                holding_film = h.film_id,
                holding_distributor = h.distributor_id,
                "referral code belongs to a different film or distributor"
            );
            None
        }
        Ok(None) => {
            tracing::warn!(code, "unknown referral code");
            None
        }
        Err(e) => {
            tracing::error!(code, error = %e, "referral lookup failed");
            None
        }
    }
}

//! Revenue Split Calculator
//!
//! 판매 1건의 수익 분배: Filmmaker 70% / Distributor 20% / Platform 10%
//!
//! 각 지분은 판매액에서 독립적으로 계산한다 (다른 지분의 나머지로 계산하지 않음).
//! micro-USD 정수 연산이라 지분별 내림 오차는 최대 2 micro-USD이고,
//! 이 잔여분은 platform 지분에 더해 세 지분의 합이 항상 판매액과 같도록 한다.

use anyhow::{bail, Result};
use serde::Serialize;

use crate::types::UsdAmount;

/// basis points (1/100 %)
pub const FILMMAKER_BPS: i64 = 7_000;
pub const DISTRIBUTOR_BPS: i64 = 2_000;
pub const PLATFORM_BPS: i64 = 1_000;

const TOTAL_BPS: i64 = 10_000;

/// 분배 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSplit {
    pub filmmaker_share: UsdAmount,
    pub distributor_share: UsdAmount,
    pub platform_share: UsdAmount,
}

impl RevenueSplit {
    pub fn total(&self) -> UsdAmount {
        UsdAmount::from_micros(
            self.filmmaker_share.micros()
                + self.distributor_share.micros()
                + self.platform_share.micros(),
        )
    }
}

/// 판매액을 세 지분으로 분배
///
/// # Errors
///
/// 판매액이 0 이하이면 실패
pub fn split_revenue(sale_amount: UsdAmount) -> Result<RevenueSplit> {
    if !sale_amount.is_positive() {
        bail!("sale amount must be positive, got {}", sale_amount);
    }

    let micros = sale_amount.micros() as i128;
    let share = |bps: i64| (micros * bps as i128 / TOTAL_BPS as i128) as i64;

    let filmmaker = share(FILMMAKER_BPS);
    let distributor = share(DISTRIBUTOR_BPS);
    let platform = share(PLATFORM_BPS);

    // 내림 잔여분 (0..=2 micro-USD)
    let residue = sale_amount.micros() - filmmaker - distributor - platform;

    Ok(RevenueSplit {
        filmmaker_share: UsdAmount::from_micros(filmmaker),
        distributor_share: UsdAmount::from_micros(distributor),
        platform_share: UsdAmount::from_micros(platform + residue),
    })
}

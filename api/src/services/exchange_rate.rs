//! Exchange Rate Provider
//!
//! KES -> USD 환율을 Pretium API에서 조회한다.
//!
//! 실패(키 없음, 네트워크 오류, non-2xx, 잘못된 응답, 0 이하 환율) 시
//! 고정 fallback 환율을 반환한다. 캐시 없음: 요청마다 API를 호출할 수 있다.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// API 장애 시 사용하는 근사 환율 (1 KES ≈ 0.0077 USD)
pub const FALLBACK_KES_USD_RATE: f64 = 0.0077;

/// 환율 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Pretium,
    Fallback,
}

/// 환율 조회 결과
#[derive(Debug, Clone, Serialize)]
pub struct ExchangeRate {
    pub rate: f64,
    pub source: RateSource,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct PretiumRateResponse {
    pair: Option<String>,
    rate: f64,
}

/// 환율 서비스
pub struct ExchangeRateProvider {
    api_url: String,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl ExchangeRateProvider {
    const REQUEST_TIMEOUT_SECS: u64 = 5;

    pub fn new(api_url: &str, api_key: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(Self::REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build exchange rate HTTP client")?;

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key,
            http,
        })
    }

    /// KES -> USD 환율. 실패 시 fallback
    pub async fn kes_to_usd(&self) -> ExchangeRate {
        match self.fetch_rate("KES", "USD").await {
            Ok(rate) => ExchangeRate {
                rate,
                source: RateSource::Pretium,
                timestamp: Utc::now(),
            },
            Err(e) => {
                tracing::warn!(error = %e, "exchange rate unavailable, using fallback");
                ExchangeRate {
                    rate: FALLBACK_KES_USD_RATE,
                    source: RateSource::Fallback,
                    timestamp: Utc::now(),
                }
            }
        }
    }

    async fn fetch_rate(&self, from: &str, to: &str) -> Result<f64> {
        let Some(api_key) = self.api_key.as_deref() else {
            bail!("PRETIUM_API_KEY not configured");
        };

        let response = self
            .http
            .get(format!("{}/exchange-rates", self.api_url))
            .query(&[("from", from), ("to", to)])
            .bearer_auth(api_key)
            .send()
            .await
            .context("exchange rate request failed")?;

        if !response.status().is_success() {
            bail!("exchange rate API returned {}", response.status());
        }

        let body: PretiumRateResponse = response
            .json()
            .await
            .context("malformed exchange rate response")?;

        if !body.rate.is_finite() || body.rate <= 0.0 {
            bail!("exchange rate API returned invalid rate {}", body.rate);
        }

        tracing::debug!(pair = ?body.pair, rate = body.rate, "exchange rate fetched");
        Ok(body.rate)
    }
}

/// 유효한 환율이 아니면 fallback으로 대체
pub fn effective_rate(rate: Option<f64>) -> f64 {
    match rate {
        Some(r) if r.is_finite() && r > 0.0 => r,
        _ => FALLBACK_KES_USD_RATE,
    }
}

/// amount_usd = amount_kes × rate
pub fn kes_to_usd(amount_kes: f64, rate: Option<f64>) -> f64 {
    amount_kes * effective_rate(rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_with_rate() {
        let usd = kes_to_usd(1_000.0, Some(0.008));
        assert!((usd - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_or_missing_rate_falls_back() {
        assert!((kes_to_usd(1_000.0, Some(0.0)) - 7.7).abs() < 1e-9);
        assert!((kes_to_usd(1_000.0, None) - 7.7).abs() < 1e-9);
        assert!((kes_to_usd(1_000.0, Some(-1.0)) - 7.7).abs() < 1e-9);
        assert!((kes_to_usd(1_000.0, Some(f64::NAN)) - 7.7).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_missing_key_uses_fallback() {
        let provider = ExchangeRateProvider::new("http://127.0.0.1:1", None).unwrap();
        let rate = provider.kes_to_usd().await;

        assert_eq!(rate.rate, FALLBACK_KES_USD_RATE);
        assert_eq!(rate.source, RateSource::Fallback);
    }

    #[tokio::test]
    async fn test_unreachable_api_uses_fallback() {
        let provider = ExchangeRateProvider::new("http://127.0.0.1:1", Some("key".to_string())).unwrap();
        let rate = provider.kes_to_usd().await;

        assert_eq!(rate.rate, FALLBACK_KES_USD_RATE);
        assert_eq!(rate.source, RateSource::Fallback);
    }
}

//! Common Types Module
//!
//! 애플리케이션 전반에서 사용되는 공통 타입 정의

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// API 응답 래퍼
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

/// Ethereum 주소 타입
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthAddress(String);

impl EthAddress {
    pub fn new(addr: &str) -> Result<Self, String> {
        let addr = addr.to_lowercase();
        if addr.starts_with("0x")
            && addr.len() == 42
            && addr[2..].chars().all(|c| c.is_ascii_hexdigit())
        {
            Ok(Self(addr))
        } else {
            Err("Invalid Ethereum address format".to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// USD 금액 (micro-USD, 6 decimals)
///
/// USDC/USDT와 같은 정밀도. 부동소수점 오차 없이 저장/합산하기 위해
/// 정수로 보관하고, JSON 경계에서만 달러 단위 `f64`로 변환한다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
#[sqlx(transparent)]
pub struct UsdAmount(i64);

impl UsdAmount {
    pub const MICROS_PER_USD: i64 = 1_000_000;
    pub const ZERO: UsdAmount = UsdAmount(0);

    pub const fn from_micros(micros: i64) -> Self {
        Self(micros)
    }

    /// 달러 단위 값에서 변환 (가장 가까운 micro-USD로 반올림)
    pub fn from_dollars(dollars: f64) -> Result<Self, String> {
        if !dollars.is_finite() {
            return Err("amount must be a finite number".to_string());
        }
        let micros = (dollars * Self::MICROS_PER_USD as f64).round();
        if micros.abs() >= i64::MAX as f64 {
            return Err("amount is out of range".to_string());
        }
        Ok(Self(micros as i64))
    }

    pub const fn micros(&self) -> i64 {
        self.0
    }

    pub fn to_dollars(&self) -> f64 {
        self.0 as f64 / Self::MICROS_PER_USD as f64
    }

    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    pub fn checked_add(self, other: UsdAmount) -> Option<UsdAmount> {
        self.0.checked_add(other.0).map(UsdAmount)
    }
}

impl fmt::Display for UsdAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per = Self::MICROS_PER_USD as u64;
        write!(f, "{}{}.{:06}", sign, abs / per, abs % per)
    }
}

impl Serialize for UsdAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_dollars())
    }
}

impl<'de> Deserialize<'de> for UsdAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let dollars = f64::deserialize(deserializer)?;
        UsdAmount::from_dollars(dollars).map_err(serde::de::Error::custom)
    }
}

/// 신청서 종류
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationKind {
    Filmmaker,
    Distributor,
}

impl ApplicationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationKind::Filmmaker => "filmmaker",
            ApplicationKind::Distributor => "distributor",
        }
    }
}

impl FromStr for ApplicationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "filmmaker" => Ok(ApplicationKind::Filmmaker),
            "distributor" => Ok(ApplicationKind::Distributor),
            other => Err(format!("unknown application kind: {}", other)),
        }
    }
}

/// 신청서 상태 (pending -> approved | rejected)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApplicationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
        }
    }
}

impl FromStr for ApplicationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ApplicationStatus::Pending),
            "approved" => Ok(ApplicationStatus::Approved),
            "rejected" => Ok(ApplicationStatus::Rejected),
            other => Err(format!("unknown application status: {}", other)),
        }
    }
}

/// 결제 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
            PaymentStatus::Failed => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eth_address_valid() {
        let addr = EthAddress::new("0x1234567890123456789012345678901234567890");
        assert!(addr.is_ok());
    }

    #[test]
    fn test_eth_address_invalid() {
        assert!(EthAddress::new("invalid").is_err());
        assert!(EthAddress::new("0xzz34567890123456789012345678901234567890").is_err());
    }

    #[test]
    fn test_usd_amount_from_dollars() {
        let amount = UsdAmount::from_dollars(9.99).unwrap();
        assert_eq!(amount.micros(), 9_990_000);
        assert!((amount.to_dollars() - 9.99).abs() < 1e-9);
        assert_eq!(amount.to_string(), "9.990000");
    }

    #[test]
    fn test_usd_amount_rejects_nan() {
        assert!(UsdAmount::from_dollars(f64::NAN).is_err());
        assert!(UsdAmount::from_dollars(f64::INFINITY).is_err());
    }

    #[test]
    fn test_usd_amount_json() {
        let amount: UsdAmount = serde_json::from_str("12.5").unwrap();
        assert_eq!(amount, UsdAmount::from_micros(12_500_000));
        assert_eq!(serde_json::to_string(&amount).unwrap(), "12.5");
    }

    #[test]
    fn test_status_parsing() {
        assert_eq!("approved".parse::<ApplicationStatus>(), Ok(ApplicationStatus::Approved));
        assert!("archived".parse::<ApplicationStatus>().is_err());
        assert_eq!("distributor".parse::<ApplicationKind>(), Ok(ApplicationKind::Distributor));
    }
}

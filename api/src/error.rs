//! Error Handling Module
//!
//! HTTP 상태 코드 매핑과 서비스 에러 변환.
//! 서비스 레이어는 thiserror enum / anyhow를 반환하고, 라우트 경계에서 `ApiError`로 바뀐다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::services::approvals::ApprovalError;
use crate::services::payments::PaymentError;
use crate::services::sales::SaleError;
use crate::services::wallet::WalletError;

/// API 에러 타입
///
/// - 클라이언트 에러: 4xx (잘못된 요청, 서명 검증 실패 등)
/// - 서버 에러: 500 (내부 상세 정보는 로그에만 남김)
#[derive(Debug, Error)]
pub enum ApiError {
    // ============ 400 Bad Request ============
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Validation failed: {0}")]
    ValidationError(String),

    // ============ 401 Unauthorized ============
    #[error("Invalid signature")]
    Unauthorized,

    // ============ 404 Not Found ============
    #[error("{0}")]
    NotFound(String),

    // ============ 500 Internal Server Error ============
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Internal server error")]
    InternalError,
}

/// API 에러 응답 구조
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            // 4xx 클라이언트 에러
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg.clone(), None),
            ApiError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR",
                "Validation failed".to_string(),
                Some(msg.clone()),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "Invalid signature".to_string(),
                None,
            ),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone(), None),

            // 5xx 서버 에러
            ApiError::DatabaseError(_) => {
                tracing::error!("Database error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "Database error occurred".to_string(),
                    None,
                )
            }
            ApiError::ExternalService(_) => {
                tracing::error!("External service error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTERNAL_SERVICE_ERROR",
                    "An upstream service failed".to_string(),
                    None,
                )
            }
            ApiError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_ERROR",
                "An internal error occurred".to_string(),
                None,
            ),
        };

        let body = ErrorResponse {
            error: message,
            code: code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}

/// SQLx 에러를 ApiError로 변환
impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        tracing::error!("SQLx error: {:?}", err);
        ApiError::DatabaseError(err.to_string())
    }
}

/// anyhow 에러를 ApiError로 변환
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        tracing::error!("Anyhow error: {:?}", err);
        ApiError::InternalError
    }
}

impl From<SaleError> for ApiError {
    fn from(err: SaleError) -> Self {
        match err {
            SaleError::InvalidAmount(msg) => ApiError::ValidationError(msg),
            SaleError::FilmNotFound(_) => ApiError::NotFound(err.to_string()),
            SaleError::HoldingMismatch(_) => ApiError::BadRequest(err.to_string()),
            SaleError::Store(e) => e.into(),
        }
    }
}

impl From<ApprovalError> for ApiError {
    fn from(err: ApprovalError) -> Self {
        match err {
            ApprovalError::NotFound(msg) => ApiError::NotFound(msg),
            ApprovalError::Invalid(msg) => ApiError::BadRequest(msg),
            ApprovalError::Store(e) => e.into(),
        }
    }
}

impl From<PaymentError> for ApiError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::Invalid(msg) => ApiError::ValidationError(msg),
            PaymentError::FilmNotFound(_) => ApiError::NotFound(err.to_string()),
            PaymentError::InvalidSignature => ApiError::Unauthorized,
            PaymentError::MalformedPayload(msg) => ApiError::BadRequest(msg),
            PaymentError::Gateway(e) => ApiError::ExternalService(format!("{:#}", e)),
            PaymentError::Store(e) => e.into(),
        }
    }
}

impl From<WalletError> for ApiError {
    fn from(err: WalletError) -> Self {
        tracing::error!("Wallet error: {}", err);
        ApiError::InternalError
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let cases = [
            (ApiError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::ValidationError("x".into()), StatusCode::BAD_REQUEST),
            (ApiError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ApiError::NotFound("Film 1 not found".into()), StatusCode::NOT_FOUND),
            (ApiError::DatabaseError("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::ExternalService("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (ApiError::InternalError, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }

    #[test]
    fn test_service_error_mapping() {
        assert!(matches!(
            ApiError::from(SaleError::FilmNotFound(3)),
            ApiError::NotFound(msg) if msg == "Film 3 not found"
        ));
        assert!(matches!(
            ApiError::from(SaleError::HoldingMismatch(9)),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(PaymentError::InvalidSignature),
            ApiError::Unauthorized
        ));
        assert!(matches!(
            ApiError::from(ApprovalError::Invalid("x".into())),
            ApiError::BadRequest(_)
        ));
    }
}

//! Application Endpoints
//!
//! filmmaker / distributor 신청서 접수와 조회.
//! 폼에서 알려진 필드 외의 값은 `details`(JSONB)에 그대로 보관한다.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    db::{Application, NewApplication},
    error::ApiError,
    services::approvals,
    types::{ApiResponse, ApplicationKind, EthAddress, UsdAmount},
    AppState,
};

const SUBMITTED_MESSAGE: &str = "Application submitted successfully! We will review your \
     application and send you an email within 48 hours.";

/// 신청서 폼 (camelCase)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationForm {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    pub company_name: Option<String>,
    pub country: Option<String>,
    pub wallet_address: Option<String>,
    pub film_title: Option<String>,
    pub film_price_usd: Option<f64>,
    /// 나머지 필드
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl ApplicationForm {
    fn into_new_application(self, kind: ApplicationKind) -> Result<NewApplication, ApiError> {
        let wallet_address = match self.wallet_address.as_deref().map(str::trim) {
            Some("") | None => None,
            Some(addr) => Some(
                EthAddress::new(addr)
                    .map_err(ApiError::ValidationError)?
                    .as_str()
                    .to_string(),
            ),
        };

        let film_price_usd = self
            .film_price_usd
            .map(UsdAmount::from_dollars)
            .transpose()
            .map_err(ApiError::ValidationError)?;

        Ok(NewApplication {
            kind,
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.trim().to_string(),
            company_name: self.company_name,
            country: self.country,
            wallet_address,
            film_title: self.film_title,
            film_price_usd,
            details: serde_json::Value::Object(self.extra),
        })
    }
}

async fn submit(
    state: AppState,
    kind: ApplicationKind,
    form: ApplicationForm,
) -> Result<(StatusCode, Json<ApiResponse<Application>>), ApiError> {
    let application = approvals::submit_application(
        state.store.as_ref(),
        form.into_new_application(kind)?,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(application, SUBMITTED_MESSAGE)),
    ))
}

/// POST /api/applications/filmmaker
pub async fn submit_filmmaker(
    State(state): State<AppState>,
    Json(form): Json<ApplicationForm>,
) -> Result<(StatusCode, Json<ApiResponse<Application>>), ApiError> {
    submit(state, ApplicationKind::Filmmaker, form).await
}

/// POST /api/applications/distributor
pub async fn submit_distributor(
    State(state): State<AppState>,
    Json(form): Json<ApplicationForm>,
) -> Result<(StatusCode, Json<ApiResponse<Application>>), ApiError> {
    submit(state, ApplicationKind::Distributor, form).await
}

/// GET /api/applications/filmmaker
pub async fn list_filmmakers(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Application>>>, ApiError> {
    let applications = state.store.list_applications(ApplicationKind::Filmmaker).await?;
    Ok(Json(ApiResponse::success(applications)))
}

/// GET /api/applications/distributor
pub async fn list_distributors(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Application>>>, ApiError> {
    let applications = state.store.list_applications(ApplicationKind::Distributor).await?;
    Ok(Json(ApiResponse::success(applications)))
}

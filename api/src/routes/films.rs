//! Film Endpoints
//!
//! 승인된 영화 조회와 트레일러 업로드.

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::{
    db::Film,
    error::ApiError,
    services::blob::trailer_path,
    types::ApiResponse,
    AppState,
};

/// 트레일러 최대 크기 (200 MB)
pub const TRAILER_MAX_BYTES: usize = 200 * 1024 * 1024;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailerUploaded {
    pub url: String,
    pub file_key: String,
    pub file_name: String,
    pub file_size: usize,
}

/// GET /api/films
///
/// 승인된 영화 목록 (최신순)
pub async fn list_films(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<Film>>>, ApiError> {
    let films = state.store.list_approved_films().await?;
    Ok(Json(ApiResponse::success(films)))
}

/// GET /api/films/:id
pub async fn get_film(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<ApiResponse<Film>>, ApiError> {
    let film = state
        .store
        .get_film(id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Film {} not found", id)))?;
    Ok(Json(ApiResponse::success(film)))
}

/// POST /api/films/:id/trailer (multipart, field `file`)
///
/// blob storage에 업로드한 뒤 공개 URL을 영화에 저장한다.
pub async fn upload_trailer(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<TrailerUploaded>>), ApiError> {
    if state.store.get_film(id).await?.is_none() {
        return Err(ApiError::NotFound(format!("Film {} not found", id)));
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("trailer").to_string();
        let content_type = field.content_type().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        upload = Some((file_name, content_type, bytes));
        break;
    }

    let (file_name, content_type, bytes) = upload
        .filter(|(_, _, bytes)| !bytes.is_empty())
        .ok_or_else(|| ApiError::BadRequest("No file provided".to_string()))?;
    let file_size = bytes.len();

    let blob = state
        .blob
        .put_public(&trailer_path(id, &file_name), content_type.as_deref(), bytes.to_vec())
        .await
        .map_err(|e| ApiError::ExternalService(format!("{:#}", e)))?;

    if !state.store.set_trailer_url(id, &blob.url).await? {
        tracing::warn!(film_id = id, "film disappeared before trailer url was stored");
    }

    tracing::info!(film_id = id, file_name = %file_name, file_size, url = %blob.url, "trailer uploaded");

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            TrailerUploaded {
                url: blob.url,
                file_key: blob.pathname,
                file_name,
                file_size,
            },
            "Trailer uploaded successfully",
        )),
    ))
}

use axum::{
    extract::{multipart::MultipartError, DefaultBodyLimit, Multipart, Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ImageDto, UploadItem},
    services,
};
use crate::{
    auth::extractors::AuthUser,
    config::ImageConfig,
    error::{AppError, AppResult, ValidationReason},
    state::AppState,
};

// Room for multipart framing on top of the largest accepted file.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

pub fn image_routes(cfg: &ImageConfig) -> Router<AppState> {
    Router::new()
        .route(
            "/images",
            get(list_images)
                .post(upload_image)
                .layer(DefaultBodyLimit::max(cfg.max_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/images/:id", get(get_image).delete(delete_image))
        .route("/images/:id/download", get(download_image))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ValidationReason::TooLarge.into()
    } else {
        AppError::Internal(anyhow::anyhow!("read multipart: {}", e))
    }
}

/// POST /images, multipart field `file`.
#[instrument(skip(state, mp))]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthUser,
    mut mp: Multipart,
) -> AppResult<(StatusCode, HeaderMap, Json<ImageDto>)> {
    let mut upload = None;
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let body = field.bytes().await.map_err(multipart_error)?;
        upload = Some(UploadItem {
            body,
            file_name,
            content_type,
        });
        break;
    }
    let item = upload.ok_or(ValidationReason::MissingFile)?;

    let dto = services::upload(&state, user.id, item).await?;

    let mut headers = HeaderMap::new();
    if let Ok(location) = HeaderValue::from_str(&format!("/api/v1/images/{}", dto.id)) {
        headers.insert(header::LOCATION, location);
    }
    Ok((StatusCode::CREATED, headers, Json(dto)))
}

#[instrument(skip(state))]
pub async fn list_images(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<Vec<ImageDto>>> {
    Ok(Json(services::list_for_owner(&state, user.id).await?))
}

#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    _user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ImageDto>> {
    Ok(Json(services::get_by_id(&state, id).await?))
}

#[instrument(skip(state))]
pub async fn delete_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<StatusCode> {
    services::delete(&state, id, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn download_image(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let file = services::download(&state, id, user.id).await?;

    let mut headers = HeaderMap::new();
    let content_type = HeaderValue::from_str(&file.content_type)
        .unwrap_or(HeaderValue::from_static("application/octet-stream"));
    headers.insert(header::CONTENT_TYPE, content_type);
    if let Ok(disposition) =
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", file.file_name))
    {
        headers.insert(header::CONTENT_DISPOSITION, disposition);
    }
    Ok((headers, file.body))
}

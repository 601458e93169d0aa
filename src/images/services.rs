use anyhow::Context;
use time::OffsetDateTime;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{Download, ImageDto, UploadItem},
    repo_types::Image,
};
use crate::{
    error::{AppError, AppResult, ValidationReason},
    state::AppState,
};

pub const ALLOWED_CONTENT_TYPES: [&str; 5] =
    ["image/jpeg", "image/jpg", "image/png", "image/gif", "image/webp"];

fn ext_from_mime(ct: &str) -> Option<&'static str> {
    match ct {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/gif" => Some("gif"),
        "image/webp" => Some("webp"),
        _ => None,
    }
}

/// Returns the normalized content type. Checks run in order: empty, type, size.
pub(crate) fn validate_upload(item: &UploadItem, max_bytes: usize) -> Result<String, ValidationReason> {
    if item.body.is_empty() {
        return Err(ValidationReason::EmptyFile);
    }
    let content_type = item.content_type.trim().to_ascii_lowercase();
    if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
        return Err(ValidationReason::UnsupportedType);
    }
    if item.body.len() > max_bytes {
        return Err(ValidationReason::TooLarge);
    }
    Ok(content_type)
}

/// Keeps the last path segment and replaces anything outside `[A-Za-z0-9._-]`.
pub(crate) fn sanitize_file_name(name: &str, content_type: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        format!("image.{}", ext_from_mime(content_type).unwrap_or("bin"))
    } else {
        truncate_keeping_ext(cleaned)
    }
}

const MAX_FILE_NAME_LEN: usize = 200;
const MAX_EXT_LEN: usize = 16;

// Input is already ASCII, so byte offsets are char boundaries.
fn truncate_keeping_ext(name: &str) -> String {
    if name.len() <= MAX_FILE_NAME_LEN {
        return name.to_string();
    }
    match name.rfind('.') {
        Some(dot) if name.len() - dot <= MAX_EXT_LEN + 1 => {
            let ext = &name[dot..];
            format!("{}{}", &name[..MAX_FILE_NAME_LEN - ext.len()], ext)
        }
        _ => name[..MAX_FILE_NAME_LEN].to_string(),
    }
}

pub(crate) fn storage_key(file_name: &str) -> String {
    format!("{}_{}", Uuid::new_v4(), file_name)
}

pub async fn presign(st: &AppState, storage_key: &str) -> anyhow::Result<String> {
    st.storage
        .presign_get(storage_key, st.config.images.link_ttl_secs)
        .await
        .with_context(|| format!("presign url for {}", storage_key))
}

async fn to_dto(st: &AppState, image: Image) -> AppResult<ImageDto> {
    let url = presign(st, &image.storage_key).await?;
    Ok(ImageDto::new(image, url))
}

#[instrument(skip(st, item), fields(file_name = %item.file_name, size = item.body.len()))]
pub async fn upload(st: &AppState, owner_id: Uuid, item: UploadItem) -> AppResult<ImageDto> {
    let content_type = validate_upload(&item, st.config.images.max_bytes).map_err(|reason| {
        warn!(code = reason.code(), "upload rejected");
        AppError::Validation(reason)
    })?;

    let file_name = sanitize_file_name(&item.file_name, &content_type);
    let key = storage_key(&file_name);
    let size_bytes = item.body.len() as i64;

    st.storage
        .put_object(&key, item.body, &content_type)
        .await
        .with_context(|| format!("put_object {}", key))?;

    let image = Image {
        id: Uuid::new_v4(),
        file_name,
        original_file_name: item.file_name,
        content_type,
        size_bytes,
        storage_key: key,
        uploaded_at: OffsetDateTime::now_utc(),
        user_id: owner_id,
    };

    if let Err(e) = st.images.create(&image).await {
        error!(error = ?e, storage_key = %image.storage_key, "image metadata insert failed; removing blob");
        if let Err(cleanup) = st.storage.delete_object(&image.storage_key).await {
            error!(error = ?cleanup, storage_key = %image.storage_key, "orphan blob left behind");
        }
        return Err(e.into());
    }

    info!(image_id = %image.id, %owner_id, "image uploaded");
    to_dto(st, image).await
}

#[instrument(skip(st))]
pub async fn list_for_owner(st: &AppState, owner_id: Uuid) -> AppResult<Vec<ImageDto>> {
    let images = st.images.list_by_owner(owner_id).await?;
    let mut out = Vec::with_capacity(images.len());
    for image in images {
        out.push(to_dto(st, image).await?);
    }
    Ok(out)
}

#[instrument(skip(st))]
pub async fn get_by_id(st: &AppState, image_id: Uuid) -> AppResult<ImageDto> {
    let image = st.images.find_by_id(image_id).await?.ok_or(AppError::NotFound)?;
    to_dto(st, image).await
}

async fn owned_image(st: &AppState, image_id: Uuid, caller_id: Uuid) -> AppResult<Image> {
    let image = st.images.find_by_id(image_id).await?.ok_or(AppError::NotFound)?;
    if !st.images.is_owner(image_id, caller_id).await? {
        warn!(%image_id, %caller_id, "image access denied");
        return Err(AppError::Forbidden);
    }
    Ok(image)
}

/// Blob goes first; the record is only removed once the blob is gone.
async fn remove(st: &AppState, image: &Image) -> anyhow::Result<()> {
    st.storage
        .delete_object(&image.storage_key)
        .await
        .with_context(|| format!("delete_object {}", image.storage_key))?;
    st.images.delete(image.id).await?;
    Ok(())
}

#[instrument(skip(st))]
pub async fn delete(st: &AppState, image_id: Uuid, caller_id: Uuid) -> AppResult<()> {
    let image = owned_image(st, image_id, caller_id).await?;
    remove(st, &image).await?;
    info!(%image_id, "image deleted");
    Ok(())
}

#[instrument(skip(st))]
pub async fn download(st: &AppState, image_id: Uuid, caller_id: Uuid) -> AppResult<Download> {
    let image = owned_image(st, image_id, caller_id).await?;
    let body = st
        .storage
        .get_object(&image.storage_key)
        .await
        .with_context(|| format!("get_object {}", image.storage_key))?;
    Ok(Download {
        body,
        content_type: image.content_type,
        file_name: image.file_name,
    })
}

/// Deletes every image owned by `owner_id`, stopping at the first failure.
#[instrument(skip(st))]
pub async fn purge_owner(st: &AppState, owner_id: Uuid) -> anyhow::Result<usize> {
    let images = st.images.list_by_owner(owner_id).await?;
    for image in &images {
        remove(st, image).await?;
    }
    Ok(images.len())
}

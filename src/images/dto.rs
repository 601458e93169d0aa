use bytes::Bytes;
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::images::repo_types::Image;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDto {
    pub id: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub uploaded_at: OffsetDateTime,
    pub download_url: String,
}

impl ImageDto {
    pub fn new(image: Image, download_url: String) -> Self {
        Self {
            id: image.id,
            file_name: image.file_name,
            original_file_name: image.original_file_name,
            content_type: image.content_type,
            size_bytes: image.size_bytes,
            uploaded_at: image.uploaded_at,
            download_url,
        }
    }
}

/// A file as received from the client.
pub struct UploadItem {
    pub body: Bytes,
    pub file_name: String,
    pub content_type: String,
}

/// Raw object bytes plus what the caller needs to present them.
pub struct Download {
    pub body: Bytes,
    pub content_type: String,
    pub file_name: String,
}

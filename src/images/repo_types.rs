use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Image metadata row. `storage_key` locates the blob and never leaves the service.
#[derive(Debug, Clone, FromRow)]
pub struct Image {
    pub id: Uuid,
    pub file_name: String,
    pub original_file_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    pub storage_key: String,
    pub uploaded_at: OffsetDateTime,
    pub user_id: Uuid,
}

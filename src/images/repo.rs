use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::images::repo_types::Image;

/// Image metadata store.
#[async_trait]
pub trait ImageRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Image>>;
    /// Most recent upload first.
    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Image>>;
    async fn create(&self, image: &Image) -> anyhow::Result<()>;
    async fn delete(&self, id: Uuid) -> anyhow::Result<()>;
    async fn is_owner(&self, image_id: Uuid, owner_id: Uuid) -> anyhow::Result<bool>;
}

pub struct PgImageRepository {
    db: PgPool,
}

impl PgImageRepository {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ImageRepository for PgImageRepository {
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Image>> {
        let row = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, file_name, original_file_name, content_type, size_bytes,
                   storage_key, uploaded_at, user_id
              FROM images
             WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .context("find image by id")?;
        Ok(row)
    }

    async fn list_by_owner(&self, owner_id: Uuid) -> anyhow::Result<Vec<Image>> {
        let rows = sqlx::query_as::<_, Image>(
            r#"
            SELECT id, file_name, original_file_name, content_type, size_bytes,
                   storage_key, uploaded_at, user_id
              FROM images
             WHERE user_id = $1
             ORDER BY uploaded_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.db)
        .await
        .context("list images by owner")?;
        Ok(rows)
    }

    async fn create(&self, image: &Image) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO images (id, file_name, original_file_name, content_type, size_bytes,
                                storage_key, uploaded_at, user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(image.id)
        .bind(&image.file_name)
        .bind(&image.original_file_name)
        .bind(&image.content_type)
        .bind(image.size_bytes)
        .bind(&image.storage_key)
        .bind(image.uploaded_at)
        .bind(image.user_id)
        .execute(&self.db)
        .await
        .context("insert image")?;
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM images WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await
            .context("delete image")?;
        Ok(())
    }

    async fn is_owner(&self, image_id: Uuid, owner_id: Uuid) -> anyhow::Result<bool> {
        let (owned,): (bool,) = sqlx::query_as(
            "SELECT EXISTS(SELECT 1 FROM images WHERE id = $1 AND user_id = $2)",
        )
        .bind(image_id)
        .bind(owner_id)
        .fetch_one(&self.db)
        .await
        .context("check image owner")?;
        Ok(owned)
    }
}

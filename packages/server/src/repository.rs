use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entity::image;
use crate::error::AppError;

/// Fields required to create an image record. The blob must already be
/// committed; referential integrity is enforced by creation order, not
/// checked after the fact.
pub struct NewImage {
    pub user_id: i32,
    pub blob_id: Uuid,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Durable store of image metadata records.
#[derive(Clone)]
pub struct ImageRepository {
    db: DatabaseConnection,
}

impl ImageRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a new record. The ID is repository-generated (UUIDv7) and
    /// `uploaded_at` is set here, never by the caller.
    pub async fn create(&self, new: NewImage) -> Result<image::Model, AppError> {
        if new.original_name.trim().is_empty() {
            return Err(AppError::Validation("Filename is required".into()));
        }
        if new.content_type.trim().is_empty() {
            return Err(AppError::Validation("Content type is required".into()));
        }

        let model = image::ActiveModel {
            id: Set(Uuid::now_v7()),
            user_id: Set(new.user_id),
            blob_id: Set(new.blob_id),
            original_name: Set(new.original_name),
            content_type: Set(new.content_type),
            size: Set(i64::try_from(new.size).unwrap_or(i64::MAX)),
            description: Set(new.description),
            tags: Set(crate::models::image::join_tags(&new.tags)),
            uploaded_at: Set(Utc::now()),
        };

        Ok(model.insert(&self.db).await?)
    }

    /// All records for one owner, newest first.
    pub async fn list_by_owner(&self, user_id: i32) -> Result<Vec<image::Model>, AppError> {
        Ok(image::Entity::find()
            .filter(image::Column::UserId.eq(user_id))
            .order_by_desc(image::Column::UploadedAt)
            .order_by_desc(image::Column::Id)
            .all(&self.db)
            .await?)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<image::Model>, AppError> {
        Ok(image::Entity::find_by_id(id).one(&self.db).await?)
    }

    /// Look up the record referencing a blob; used by the public streaming
    /// path, where the URL carries the blob id rather than the record id.
    pub async fn find_by_blob_id(&self, blob_id: Uuid) -> Result<Option<image::Model>, AppError> {
        Ok(image::Entity::find()
            .filter(image::Column::BlobId.eq(blob_id))
            .one(&self.db)
            .await?)
    }

    /// Case-insensitive substring search over original name, description,
    /// and individual tags, scoped to one owner, newest first.
    ///
    /// Matching happens over the owner's records in memory; a full owner
    /// scan is acceptable at expected scale and keeps the tag semantics
    /// exact (per-element, not across element boundaries).
    pub async fn search(&self, user_id: i32, query: &str) -> Result<Vec<image::Model>, AppError> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Err(AppError::Validation("Search query is required".into()));
        }

        let records = self.list_by_owner(user_id).await?;
        Ok(records
            .into_iter()
            .filter(|r| record_matches(r, &needle))
            .collect())
    }

    /// Remove a record. Returns `false` when the row was already gone,
    /// which racing deletes treat as a benign idempotent outcome.
    pub async fn delete(&self, id: Uuid) -> Result<bool, AppError> {
        let result = image::Entity::delete_by_id(id).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }
}

/// `needle` must already be lowercased.
fn record_matches(record: &image::Model, needle: &str) -> bool {
    if record.original_name.to_lowercase().contains(needle) {
        return true;
    }
    if let Some(description) = &record.description
        && description.to_lowercase().contains(needle)
    {
        return true;
    }
    record
        .tags
        .split(',')
        .any(|tag| tag.to_lowercase().contains(needle))
}

use std::sync::Arc;

use common::storage::{BlobId, BlobStore, BoxReader, StorageError};
use uuid::Uuid;

use crate::audit::ActivityLog;
use crate::entity::image;
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::image::ImageResponse;
use crate::repository::{ImageRepository, NewImage};

/// MIME types accepted for upload.
const ALLOWED_CONTENT_TYPES: &[&str] = &["image/jpeg", "image/jpg", "image/png", "image/gif"];

/// A validated-not-yet-stored upload, as handed over by the HTTP layer.
pub struct NewUpload {
    pub data: BoxReader,
    pub size: u64,
    pub original_name: String,
    pub content_type: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
}

/// Orchestrates the blob store and the metadata repository.
///
/// The write ordering is blob first, record second: a failure between the
/// two leaves at worst an orphaned blob (a tolerated leak swept out of
/// band), never a record pointing at a missing blob.
#[derive(Clone)]
pub struct ImageService {
    repo: ImageRepository,
    blobs: Arc<dyn BlobStore>,
    audit: ActivityLog,
    max_blob_size: u64,
}

impl ImageService {
    pub fn new(
        repo: ImageRepository,
        blobs: Arc<dyn BlobStore>,
        audit: ActivityLog,
        max_blob_size: u64,
    ) -> Self {
        Self {
            repo,
            blobs,
            audit,
            max_blob_size,
        }
    }

    /// Validate and store an upload: blob write, then metadata commit.
    ///
    /// If the metadata commit fails after the blob write succeeded, the
    /// blob is deleted as a compensating action before the original error
    /// is surfaced; a failed rollback is logged and the blob leaks.
    pub async fn upload(
        &self,
        principal: &AuthUser,
        upload: NewUpload,
    ) -> Result<ImageResponse, AppError> {
        validate_content_type(&upload.content_type)?;
        if upload.size > self.max_blob_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {} bytes",
                self.max_blob_size
            )));
        }

        let (blob_id, size) = self.blobs.put_stream(upload.data).await?;

        let record = match self
            .repo
            .create(NewImage {
                user_id: principal.user_id,
                blob_id: blob_id.as_uuid(),
                original_name: upload.original_name,
                content_type: upload.content_type,
                size,
                description: upload.description,
                tags: upload.tags,
            })
            .await
        {
            Ok(record) => record,
            Err(err) => {
                if let Err(cleanup) = self.blobs.delete(&blob_id).await {
                    tracing::warn!(
                        %blob_id,
                        "failed to roll back blob after metadata failure: {cleanup}"
                    );
                }
                return Err(err);
            }
        };

        self.audit
            .record(
                principal.user_id,
                "UPLOAD",
                &format!("Uploaded image: {}", record.original_name),
            )
            .await;

        Ok(ImageResponse::from(record))
    }

    /// All of the caller's images, newest first.
    pub async fn list(&self, principal: &AuthUser) -> Result<Vec<ImageResponse>, AppError> {
        let records = self.repo.list_by_owner(principal.user_id).await?;
        Ok(records.into_iter().map(ImageResponse::from).collect())
    }

    /// Owner-scoped search. An empty or whitespace query is a convenience
    /// short-circuit for the full list, not an error.
    pub async fn search(
        &self,
        principal: &AuthUser,
        query: &str,
    ) -> Result<Vec<ImageResponse>, AppError> {
        if query.trim().is_empty() {
            return self.list(principal).await;
        }
        let records = self.repo.search(principal.user_id, query).await?;
        Ok(records.into_iter().map(ImageResponse::from).collect())
    }

    /// Ownership-checked delete: record removal is authoritative, blob
    /// removal is best effort.
    pub async fn delete(&self, principal: &AuthUser, record_id: Uuid) -> Result<(), AppError> {
        let record = self
            .repo
            .find_by_id(record_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Image not found".into()))?;

        if record.user_id != principal.user_id {
            return Err(AppError::PermissionDenied);
        }

        if let Err(e) = self.blobs.delete(&BlobId::from(record.blob_id)).await {
            tracing::warn!(
                image_id = %record.id,
                blob_id = %record.blob_id,
                "failed to delete blob for image: {e}"
            );
        }

        // A concurrent delete may have won the race; zero rows affected is
        // still success for this caller.
        self.repo.delete(record_id).await?;

        self.audit
            .record(
                principal.user_id,
                "DELETE",
                &format!("Deleted image: {}", record.original_name),
            )
            .await;

        Ok(())
    }

    /// Unauthenticated retrieval by blob reference. The URL itself is the
    /// capability: anyone holding it can read the bytes.
    pub async fn stream(&self, blob_ref: &str) -> Result<(image::Model, BoxReader), AppError> {
        let blob_id = BlobId::parse(blob_ref)
            .map_err(|_| AppError::NotFound("File not found".into()))?;

        let record = self
            .repo
            .find_by_blob_id(blob_id.as_uuid())
            .await?
            .ok_or_else(|| AppError::NotFound("File not found".into()))?;

        let reader = match self.blobs.get_stream(&blob_id).await {
            Ok(reader) => reader,
            Err(StorageError::NotFound(_)) => {
                // Data-integrity violation: a record exists but its blob is
                // gone. Surface NotFound to the reader, but make noise.
                tracing::error!(
                    image_id = %record.id,
                    blob_id = %record.blob_id,
                    "image record references a missing blob"
                );
                return Err(AppError::NotFound("File not found".into()));
            }
            Err(e) => return Err(e.into()),
        };

        Ok((record, reader))
    }
}

fn validate_content_type(content_type: &str) -> Result<(), AppError> {
    if ALLOWED_CONTENT_TYPES.contains(&content_type.to_lowercase().as_str()) {
        Ok(())
    } else {
        Err(AppError::Validation(
            "Only image files (jpg, jpeg, png, gif) are allowed".into(),
        ))
    }
}

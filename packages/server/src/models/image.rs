use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::entity::image;

/// Fixed-shape image metadata: these are the only fields ever read or
/// written, so no open map.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageMetadata {
    #[schema(example = "Sunset at the beach")]
    pub description: String,
    #[schema(example = json!(["vacation", "beach"]))]
    pub tags: Vec<String>,
}

/// Public view of one stored image.
#[derive(Serialize, utoipa::ToSchema)]
pub struct ImageResponse {
    /// Image record ID (UUIDv7).
    #[schema(example = "01936f0e-1234-7abc-8000-000000000001")]
    pub id: String,
    /// Stored filename; mirrors `original_name`, kept for API compatibility.
    #[schema(example = "sunset.png")]
    pub filename: String,
    /// Filename supplied at upload time.
    #[schema(example = "sunset.png")]
    pub original_name: String,
    /// Stable public URL for the blob.
    #[schema(example = "/files/8f14e45f-ceea-467f-a1c9-b9d9c1a2b3c4")]
    pub url: String,
    pub metadata: ImageMetadata,
    pub uploaded_at: DateTime<Utc>,
}

impl From<image::Model> for ImageResponse {
    fn from(model: image::Model) -> Self {
        Self {
            id: model.id.to_string(),
            filename: model.original_name.clone(),
            original_name: model.original_name,
            url: format!("/files/{}", model.blob_id),
            metadata: ImageMetadata {
                description: model.description.unwrap_or_default(),
                tags: split_tags(&model.tags),
            },
            uploaded_at: model.uploaded_at,
        }
    }
}

/// Response DTO for a successful upload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Image uploaded successfully")]
    pub message: String,
    pub image: ImageResponse,
}

/// Confirmation message with no further payload.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    #[schema(example = "Image deleted successfully")]
    pub message: String,
}

/// Split a caller-supplied comma-separated tag string into trimmed,
/// non-empty tags, preserving order.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Canonical stored form: tags joined with a single comma.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(",")
}

/// Split the canonical stored form back into tags.
pub fn split_tags(stored: &str) -> Vec<String> {
    if stored.is_empty() {
        return Vec::new();
    }
    stored.split(',').map(str::to_string).collect()
}

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Metadata record for one uploaded image. Immutable once created, aside
/// from deletion.
#[sea_orm::model]
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "image")]
pub struct Model {
    /// UUIDv7 primary key.
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owner; set at creation from the authenticated caller.
    pub user_id: i32,

    #[sea_orm(belongs_to, from = "user_id", to = "id")]
    pub user: BelongsTo<super::user::Entity>,

    /// Blob store key. Unique; never reused across records.
    #[sea_orm(unique)]
    pub blob_id: Uuid,

    /// Caller-supplied filename, for display and search only. Never used
    /// as a storage key or filesystem path.
    pub original_name: String,

    /// MIME type, validated against the upload allow-list.
    pub content_type: String,

    pub size: i64,

    pub description: Option<String>,

    /// Canonical comma-joined tag list, each element trimmed.
    pub tags: String,

    pub uploaded_at: DateTimeUtc,
}

impl ActiveModelBehavior for ActiveModel {}

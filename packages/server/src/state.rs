use std::sync::Arc;

use common::storage::BlobStore;
use sea_orm::DatabaseConnection;

use crate::audit::ActivityLog;
use crate::config::AppConfig;
use crate::repository::ImageRepository;
use crate::service::ImageService;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub images: ImageService,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// Compose the service graph. Owned by the composition root; lives for
    /// the whole process.
    pub fn new(db: DatabaseConnection, blob_store: Arc<dyn BlobStore>, config: Arc<AppConfig>) -> Self {
        let images = ImageService::new(
            ImageRepository::new(db.clone()),
            blob_store,
            ActivityLog::new(db.clone()),
            config.storage.max_blob_size,
        );
        Self { db, images, config }
    }
}

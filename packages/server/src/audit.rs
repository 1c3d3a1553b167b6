use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};

use crate::entity::activity_log;

/// Append-only activity trail.
///
/// Writes are best effort: a failed log entry is reported via `tracing`
/// and never fails the operation being logged.
#[derive(Clone)]
pub struct ActivityLog {
    db: DatabaseConnection,
}

impl ActivityLog {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn record(&self, user_id: i32, action: &str, details: &str) {
        let entry = activity_log::ActiveModel {
            user_id: Set(user_id),
            action: Set(action.to_string()),
            details: Set(details.to_string()),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        if let Err(e) = entry.insert(&self.db).await {
            tracing::warn!(user_id, action, "failed to write activity log entry: {e}");
        }
    }
}

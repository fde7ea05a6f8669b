use std::sync::Arc;

use tracing::error;

use rishta_db::Database;
use rishta_notify::Notifier;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub user_jwt_secret: String,
    pub admin_jwt_secret: String,
    pub token_ttl_days: i64,
    pub notifier: Notifier,
}

impl AppStateInner {
    /// Runs a blocking store call off the async runtime.
    pub async fn run<F, T>(&self, f: F) -> ApiResult<T>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Internal(anyhow::anyhow!("blocking task failed"))
            })?
            .map_err(ApiError::from)
    }
}

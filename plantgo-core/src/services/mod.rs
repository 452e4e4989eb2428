// File: src/services/mod.rs

use std::future::Future;
use std::time::Duration;
use crate::Error;

pub mod catalog_service;
pub mod progression_service;
pub mod notification_service;

pub use catalog_service::CatalogService;
pub use progression_service::ProgressionService;
pub use notification_service::NotificationService;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Runs `fut` under a deadline. An elapsed deadline drops the future, which
/// rolls back any transaction it still holds.
pub(crate) async fn with_deadline<T, F>(limit: Duration, fut: F) -> Result<T, Error>
where
    F: Future<Output = Result<T, Error>>,
{
    tokio::time::timeout(limit, fut).await?
}

pub(crate) fn validate_user(user_id: i64) -> Result<(), Error> {
    if user_id <= 0 {
        return Err(Error::Validation("User ID is required".to_string()));
    }
    Ok(())
}

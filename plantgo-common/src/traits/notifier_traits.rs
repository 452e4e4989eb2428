use async_trait::async_trait;
use crate::error::Error;
use crate::models::NotifyEvent;

/// Best-effort relay of game events to a user. Callers never let a failure
/// here affect the outcome of the operation that produced the event.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, user_id: i64, event: NotifyEvent) -> Result<(), Error>;
}

// File: plantgo-core/src/services/notification_service.rs

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use plantgo_common::models::{
    FcmToken, Notification, NotificationFilter, NotificationPage, NotificationPreferences,
    NotificationQuery, NotificationStatus, NotifyEvent, PreferencesUpdate,
};
use plantgo_common::traits::notifier_traits::Notifier;
use plantgo_common::traits::repository_traits::NotificationRepository;
use crate::push::{PushMessage, PushSender};
use crate::Error;
use super::{validate_user, with_deadline, DEFAULT_REQUEST_TIMEOUT};

/// Applies defaults and bounds to a caller's listing parameters.
fn resolve_filter(query: &NotificationQuery) -> Result<NotificationFilter, Error> {
    let limit = match query.limit {
        None => NotificationFilter::DEFAULT_LIMIT,
        Some(l) if l <= 0 => {
            return Err(Error::Validation("Limit must be greater than 0".to_string()));
        }
        Some(l) => l.min(NotificationFilter::MAX_LIMIT),
    };
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(Error::Validation("Offset cannot be negative".to_string()));
    }
    Ok(NotificationFilter {
        kind: query.kind,
        unread_only: query.unread_only,
        limit,
        offset,
    })
}

/// Stores in-app notifications and forwards them to the user's device.
#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
    push: Arc<dyn PushSender>,
    timeout: Duration,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>, push: Arc<dyn PushSender>) -> Self {
        Self {
            repo,
            push,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bounds every storage call and each push attempt.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Relays a plant identification from the scanning collaborator.
    pub async fn notify_plant_identified(
        &self,
        user_id: i64,
        plant_name: &str,
        confidence: f64,
    ) -> Result<(), Error> {
        validate_user(user_id)?;
        let plant_name = plant_name.trim();
        if plant_name.is_empty() {
            return Err(Error::Validation("Plant name cannot be empty".to_string()));
        }
        let event = NotifyEvent::PlantIdentified {
            plant_name: plant_name.to_string(),
            confidence,
        };
        self.notify(user_id, event).await
    }

    pub async fn list_notifications(
        &self,
        user_id: i64,
        query: &NotificationQuery,
    ) -> Result<NotificationPage, Error> {
        validate_user(user_id)?;
        let filter = resolve_filter(query)?;
        with_deadline(self.timeout, self.repo.list_for_user(user_id, &filter)).await
    }

    pub async fn unread_count(&self, user_id: i64) -> Result<i64, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, self.repo.unread_count(user_id)).await
    }

    pub async fn mark_read(&self, notification_id: i64) -> Result<(), Error> {
        if !with_deadline(self.timeout, self.repo.mark_read(notification_id, Utc::now())).await? {
            return Err(Error::NotFound(format!("Notification {} not found", notification_id)));
        }
        Ok(())
    }

    pub async fn mark_all_read(&self, user_id: i64) -> Result<u64, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, self.repo.mark_all_read(user_id, Utc::now())).await
    }

    pub async fn delete_notification(&self, notification_id: i64) -> Result<(), Error> {
        if !with_deadline(self.timeout, self.repo.delete_notification(notification_id)).await? {
            return Err(Error::NotFound(format!("Notification {} not found", notification_id)));
        }
        Ok(())
    }

    pub async fn register_fcm_token(&self, user_id: i64, token: &str) -> Result<FcmToken, Error> {
        validate_user(user_id)?;
        let token = token.trim();
        if token.is_empty() {
            return Err(Error::Validation("FCM token cannot be empty".to_string()));
        }
        let stored = with_deadline(
            self.timeout,
            self.repo.register_fcm_token(user_id, token, Utc::now()),
        )
        .await?;
        info!("Registered FCM token for user {}", user_id);
        Ok(stored)
    }

    pub async fn get_preferences(&self, user_id: i64) -> Result<NotificationPreferences, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, self.repo.get_preferences(user_id)).await
    }

    pub async fn update_preferences(
        &self,
        user_id: i64,
        update: PreferencesUpdate,
    ) -> Result<NotificationPreferences, Error> {
        validate_user(user_id)?;
        with_deadline(self.timeout, async {
            let mut prefs = self.repo.get_preferences(user_id).await?;
            prefs.apply(&update);
            self.repo.save_preferences(&prefs, Utc::now()).await?;
            Ok(prefs)
        })
        .await
    }

    /// Sends one stored notification to the user's active device, recording
    /// the outcome on the row.
    async fn deliver(&self, notification: &Notification) -> Result<(), Error> {
        let token = with_deadline(self.timeout, self.repo.active_fcm_token(notification.user_id)).await?;
        let token = match token {
            Some(t) => t,
            None => {
                debug!("User {} has no active FCM token", notification.user_id);
                return self.record_status(notification, NotificationStatus::Failed).await;
            }
        };

        let mut data: HashMap<String, String> = HashMap::new();
        if let serde_json::Value::Object(map) = &notification.data {
            for (k, v) in map {
                let s = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                data.insert(k.clone(), s);
            }
        }
        data.insert("notification_id".to_string(), notification.notification_id.to_string());
        data.insert("type".to_string(), notification.kind.to_string());
        data.insert("user_id".to_string(), notification.user_id.to_string());

        let message = PushMessage {
            token: token.token,
            title: notification.title.clone(),
            body: notification.message.clone(),
            data,
        };

        let status = match with_deadline(self.timeout, self.push.send(&message)).await {
            Ok(true) => NotificationStatus::Sent,
            Ok(false) => NotificationStatus::Pending,
            Err(e) => {
                warn!("Push delivery failed for notification {}: {}", notification.notification_id, e);
                NotificationStatus::Failed
            }
        };
        if status == NotificationStatus::Pending {
            return Ok(());
        }
        self.record_status(notification, status).await
    }

    async fn record_status(
        &self,
        notification: &Notification,
        status: NotificationStatus,
    ) -> Result<(), Error> {
        with_deadline(
            self.timeout,
            self.repo.update_status(notification.notification_id, status, Utc::now()),
        )
        .await
    }
}

#[async_trait]
impl Notifier for NotificationService {
    /// Stores the notification, then pushes it in the background.
    async fn notify(&self, user_id: i64, event: NotifyEvent) -> Result<(), Error> {
        let kind = event.kind();
        let prefs = with_deadline(self.timeout, self.repo.get_preferences(user_id)).await?;
        if !prefs.allows(kind) {
            debug!("User {} has disabled {} notifications", user_id, kind);
            return Ok(());
        }

        let data = serde_json::to_value(&event)?;
        let notification = with_deadline(
            self.timeout,
            self.repo
                .create_notification(user_id, kind, &event.title(), &event.message(), &data, Utc::now()),
        )
        .await?;

        let service = self.clone();
        tokio::spawn(async move {
            if let Err(e) = service.deliver(&notification).await {
                warn!(
                    "Could not record delivery of notification {}: {}",
                    notification.notification_id, e
                );
            }
        });
        Ok(())
    }
}

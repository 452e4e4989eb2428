//! Push delivery to user devices.
//!
//! `PushSender` is the seam between the notification service and whatever
//! actually reaches the device. The FCM implementation talks to the Firebase
//! HTTP v1 API through reqwest; `DisabledPushSender` is used when no FCM
//! credentials are configured, so notifications are still stored in-app.

pub mod fcm;

use std::collections::HashMap;
use async_trait::async_trait;
use tracing::debug;
use crate::Error;

pub use fcm::{FcmConfig, FcmPushSender};

/// A single message addressed to one device token.
#[derive(Debug, Clone, PartialEq)]
pub struct PushMessage {
    pub token: String,
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Returns `Ok(false)` when delivery is switched off and nothing was sent.
    async fn send(&self, message: &PushMessage) -> Result<bool, Error>;
}

#[derive(Debug, Clone, Default)]
pub struct DisabledPushSender;

#[async_trait]
impl PushSender for DisabledPushSender {
    async fn send(&self, message: &PushMessage) -> Result<bool, Error> {
        debug!("Push delivery disabled; skipping message '{}'", message.title);
        Ok(false)
    }
}

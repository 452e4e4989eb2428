// File: plantgo-core/src/push/fcm.rs

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use async_trait::async_trait;
use gcp_auth::{CustomServiceAccount, TokenProvider};
use serde_json::json;
use tracing::{debug, info, warn};
use crate::Error;
use super::{PushMessage, PushSender};

const FCM_ENDPOINT: &str = "https://fcm.googleapis.com/v1/projects";
const FCM_SCOPE: &str = "https://www.googleapis.com/auth/firebase.messaging";

#[derive(Debug, Clone)]
pub struct FcmConfig {
    /// Firebase service account JSON key.
    pub credentials_path: PathBuf,
    /// Overrides the `project_id` found in the key file.
    pub project_id: Option<String>,
    pub request_timeout: Duration,
}

fn send_url(project_id: &str) -> String {
    format!("{}/{}/messages:send", FCM_ENDPOINT, project_id)
}

/// Pulls `project_id` out of a service account key.
fn key_project_id(contents: &str) -> Result<Option<String>, Error> {
    let key: serde_json::Value = serde_json::from_str(contents)?;
    Ok(key
        .get("project_id")
        .and_then(|v| v.as_str())
        .map(str::to_string))
}

/// Sends through the FCM HTTP v1 API, minting OAuth2 tokens from a service
/// account. gcp_auth caches each token and refreshes it before expiry.
#[derive(Clone)]
pub struct FcmPushSender {
    client: reqwest::Client,
    auth: Arc<dyn TokenProvider>,
    project_id: String,
}

impl FcmPushSender {
    pub fn from_service_account(config: FcmConfig) -> Result<Self, Error> {
        let path = &config.credentials_path;
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Cannot read Firebase credentials {}: {}", path.display(), e))
        })?;

        let project_id = match config.project_id {
            Some(id) => id,
            None => key_project_id(&contents)?.ok_or_else(|| {
                Error::Config(format!("No project_id in Firebase credentials {}", path.display()))
            })?,
        };

        let account = CustomServiceAccount::from_json(&contents)
            .map_err(|e| Error::Config(format!("Invalid Firebase credentials: {}", e)))?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        info!("FCM push enabled for project '{}'", project_id);
        Ok(Self {
            client,
            auth: Arc::new(account),
            project_id,
        })
    }

    fn payload(message: &PushMessage) -> serde_json::Value {
        json!({
            "message": {
                "token": message.token,
                "notification": {
                    "title": message.title,
                    "body": message.body,
                },
                "data": message.data,
                "android": {
                    "priority": "high",
                    "notification": { "sound": "default" }
                }
            }
        })
    }
}

#[async_trait]
impl PushSender for FcmPushSender {
    async fn send(&self, message: &PushMessage) -> Result<bool, Error> {
        let token = TokenProvider::token(&*self.auth, &[FCM_SCOPE])
            .await
            .map_err(|e| Error::Push(format!("Cannot obtain FCM access token: {}", e)))?;

        let resp = self
            .client
            .post(send_url(&self.project_id))
            .bearer_auth(token.as_str())
            .json(&Self::payload(message))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("FCM rejected message ({}): {}", status, body);
            return Err(Error::Push(format!("FCM returned {}: {}", status, body)));
        }

        debug!("FCM accepted message '{}'", message.title);
        Ok(true)
    }
}

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// One push message for one member's devices.
#[derive(Debug, Clone, Serialize)]
pub struct PushMessage {
    pub to: Uuid,
    pub title: String,
    pub body: String,
    pub data: serde_json::Value,
}

/// Boundary to the external push provider. Delivery is best effort; callers
/// log and drop errors.
#[async_trait]
pub trait PushProvider: Send + Sync {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()>;
}

/// Posts each message as JSON to a relay endpoint with a bearer key.
pub struct HttpPush {
    client: Client,
    url: String,
    api_key: String,
}

impl HttpPush {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .connect_timeout(Duration::from_secs(3))
            .build()?;

        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }
}

#[async_trait]
impl PushProvider for HttpPush {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        self.client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(message)
            .send()
            .await?
            .error_for_status()?;
        Ok(())
    }
}

/// Used when no push endpoint is configured.
pub struct DisabledPush;

#[async_trait]
impl PushProvider for DisabledPush {
    async fn send(&self, message: &PushMessage) -> anyhow::Result<()> {
        debug!("Push disabled, dropping '{}' for {}", message.title, message.to);
        Ok(())
    }
}

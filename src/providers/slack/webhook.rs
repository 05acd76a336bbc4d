use async_trait::async_trait;
use crate::providers::traits::{MessagingError, WebhookSink};
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

/// Slack incoming webhook. The channel is whatever the webhook was created for.
#[derive(Clone)]
pub struct SlackWebhook {
    client: Client,
    url: String,
}

impl SlackWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, MessagingError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl WebhookSink for SlackWebhook {
    async fn send(&self, text: &str) -> Result<(), MessagingError> {
        let response = self.client
            .post(&self.url)
            .json(&json!({ "text": text }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            // webhooks report failures as a plain-text code, e.g. "no_service"
            let code = response.text().await.unwrap_or_default();
            let code = if code.trim().is_empty() { status.to_string() } else { code.trim().to_string() };
            return Err(MessagingError::api(code));
        }
        Ok(())
    }
}

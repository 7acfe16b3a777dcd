//! Notification dispatchers.
//!
//! Delivery is fire-and-forget: moderation operations log a failed dispatch
//! and carry on. The webhook dispatcher posts a JSON payload to an external
//! delivery service; the noop dispatcher just logs.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use crate::kernel::traits::BaseNotificationDispatcher;

/// Posts notifications to an external delivery webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl WebhookNotifier {
    pub fn new(endpoint: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl BaseNotificationDispatcher for WebhookNotifier {
    async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        message: &str,
        data: serde_json::Value,
    ) -> Result<()> {
        let payload = json!({
            "user_id": user_id,
            "title": title,
            "message": message,
            "data": data,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&payload)
            .send()
            .await
            .context("notification webhook unreachable")?;

        if !response.status().is_success() {
            anyhow::bail!("notification webhook returned {}", response.status());
        }
        Ok(())
    }
}

/// Logs and drops notifications. Used when no webhook is configured.
pub struct NoopNotifier;

#[async_trait]
impl BaseNotificationDispatcher for NoopNotifier {
    async fn send(
        &self,
        user_id: Uuid,
        title: &str,
        _message: &str,
        _data: serde_json::Value,
    ) -> Result<()> {
        tracing::debug!(%user_id, title, "notification dropped (no dispatcher configured)");
        Ok(())
    }
}

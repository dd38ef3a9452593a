use crate::error::{NotifyError, Result};
use crate::utils::{truncate_string, MAX_BODY_LENGTH};
use crate::NotificationChannel;
use async_trait::async_trait;
use slawatch_common::types::NotificationIntent;
use tracing;

pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn send(&self, intent: &NotificationIntent) -> Result<()> {
        // The intent serializes with an internally tagged payload, so the
        // receiver can switch on the "kind" field.
        let body = serde_json::to_value(intent)?;

        let mut last_err = None;
        for attempt in 0..3 {
            match self.client.post(&self.url).json(&body).send().await {
                Ok(resp) if resp.status().is_success() => {
                    last_err = None;
                    break;
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    let text = resp.text().await.unwrap_or_default();
                    tracing::warn!(
                        attempt = attempt + 1,
                        status = status,
                        "Webhook returned non-success status, retrying"
                    );
                    last_err = Some(NotifyError::Api {
                        service: "webhook".to_string(),
                        status,
                        body: truncate_string(&text, MAX_BODY_LENGTH),
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        error = %e,
                        "Webhook request failed, retrying"
                    );
                    last_err = Some(e.into());
                }
            }
            if attempt < 2 {
                tokio::time::sleep(std::time::Duration::from_millis(100 * 2u64.pow(attempt)))
                    .await;
            }
        }

        if let Some(e) = last_err {
            tracing::error!(url = %self.url, error = %e, "Webhook delivery failed after 3 attempts");
            return Err(e);
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "webhook"
    }
}

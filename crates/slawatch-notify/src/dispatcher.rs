use crate::NotificationChannel;
use slawatch_common::types::NotificationIntent;
use tracing;

/// Fans a [`NotificationIntent`] out to every configured channel.
///
/// Delivery is best effort: every channel sees the intent even when an
/// earlier one failed. Failures are logged per channel and never bubble
/// into the caller's control flow.
pub struct NotificationDispatcher {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl NotificationDispatcher {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Delivers the intent through all channels. Returns `true` when at
    /// least one channel accepted it. With no channels configured the
    /// intent is dropped (still `true`: nothing to deliver is not a
    /// failure).
    pub async fn deliver(&self, intent: &NotificationIntent) -> bool {
        if self.channels.is_empty() {
            tracing::debug!(
                incident_id = %intent.incident_id,
                kind = %intent.kind(),
                "No notification channels configured, dropping intent"
            );
            return true;
        }

        let mut any_ok = false;
        for channel in &self.channels {
            match channel.send(intent).await {
                Ok(()) => {
                    tracing::info!(
                        channel = channel.channel_name(),
                        incident_id = %intent.incident_id,
                        kind = %intent.kind(),
                        recipient = %intent.recipient,
                        "Notification delivered"
                    );
                    any_ok = true;
                }
                Err(e) => {
                    tracing::error!(
                        channel = channel.channel_name(),
                        incident_id = %intent.incident_id,
                        error = %e,
                        "Failed to send notification"
                    );
                }
            }
        }
        any_ok
    }
}

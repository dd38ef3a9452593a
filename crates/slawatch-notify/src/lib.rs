//! Notification delivery for incident lifecycle events.
//!
//! [`NotificationIntent`]s produced by the incident service and the SLA
//! scan scheduler are fanned out by the
//! [`dispatcher::NotificationDispatcher`] to every configured
//! [`NotificationChannel`]. Built-in channels cover email (SMTP) and
//! webhook.

pub mod channels;
pub mod dispatcher;
pub mod error;
pub mod utils;


use async_trait::async_trait;
use slawatch_common::types::NotificationIntent;

pub use dispatcher::NotificationDispatcher;
pub use error::{NotifyError, Result};

/// A notification delivery channel that pushes an intent to an external
/// service (e.g., SMTP relay, webhook endpoint).
///
/// Instances are built from the server configuration at startup and
/// registered with the dispatcher.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Delivers the intent through this channel.
    ///
    /// # Errors
    ///
    /// Returns an error if delivery fails after retries (if applicable).
    async fn send(&self, intent: &NotificationIntent) -> Result<()>;

    /// Returns the channel type name (e.g., `"email"`, `"webhook"`).
    fn channel_name(&self) -> &str;
}

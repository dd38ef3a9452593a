use crate::error::Result;
use crate::NotificationChannel;
use async_trait::async_trait;
use chrono::Duration;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use slawatch_common::types::{format_duration, NotificationIntent, NotificationPayload};
use tracing;

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
}

impl EmailChannel {
    pub fn new(
        smtp_host: &str,
        smtp_port: u16,
        username: Option<&str>,
        password: Option<&str>,
        from: &str,
    ) -> Result<Self> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::relay(smtp_host)?.port(smtp_port);

        if let (Some(user), Some(pass)) = (username, password) {
            builder = builder.credentials(Credentials::new(user.to_string(), pass.to_string()));
        }

        let transport = builder.build();
        Ok(Self {
            transport,
            from: from.to_string(),
        })
    }

    fn subject_tag(intent: &NotificationIntent) -> &'static str {
        match &intent.payload {
            NotificationPayload::Created { .. } => "New incident",
            NotificationPayload::Breach { .. } => "SLA breached",
            NotificationPayload::ApproachingDeadline { .. } => "SLA deadline approaching",
            NotificationPayload::Resolved { .. } => "Incident resolved",
        }
    }

    fn format_body(intent: &NotificationIntent) -> String {
        let header = format!(
            "Incident: {title}\nPriority: {priority}\nStatus: {status}",
            title = intent.incident_title,
            priority = intent.priority,
            status = intent.status,
        );
        match &intent.payload {
            NotificationPayload::Created {
                response_deadline,
                resolution_deadline,
            } => format!(
                "{header}\nRespond by: {response_deadline}\nResolve by: {resolution_deadline}"
            ),
            NotificationPayload::Breach {
                breach,
                deadline,
                overdue_minutes,
            } => format!(
                "{header}\nMissed deadline: {breach} ({deadline})\nOverdue by: {overdue}",
                overdue = format_duration(Duration::minutes(*overdue_minutes)),
            ),
            NotificationPayload::ApproachingDeadline {
                resolution_deadline,
                minutes_remaining,
            } => format!(
                "{header}\nResolve by: {resolution_deadline}\nTime remaining: {remaining}",
                remaining = format_duration(Duration::minutes(*minutes_remaining)),
            ),
            NotificationPayload::Resolved {
                resolved_at,
                sla_met,
                resolution_minutes,
            } => format!(
                "{header}\nResolved at: {resolved_at}\nTime to resolution: {elapsed}\nSLA met: {met}",
                elapsed = format_duration(Duration::minutes(*resolution_minutes)),
                met = if *sla_met { "yes" } else { "no" },
            ),
        }
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    async fn send(&self, intent: &NotificationIntent) -> Result<()> {
        let subject = format!(
            "[slawatch][{}] {}: {}",
            intent.priority,
            Self::subject_tag(intent),
            intent.incident_title
        );
        let body = Self::format_body(intent);

        let email = Message::builder()
            .from(self.from.parse()?)
            .to(intent.recipient.parse()?)
            .subject(&subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)?;

        let mut last_err = None;
        for attempt in 0..3 {
            match self.transport.send(email.clone()).await {
                Ok(_) => {
                    last_err = None;
                    break;
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        recipient = %intent.recipient,
                        error = %e,
                        "Email send failed, retrying"
                    );
                    last_err = Some(e);
                    if attempt < 2 {
                        tokio::time::sleep(std::time::Duration::from_millis(
                            100 * 2u64.pow(attempt),
                        ))
                        .await;
                    }
                }
            }
        }

        if let Some(e) = last_err {
            tracing::error!(recipient = %intent.recipient, error = %e, "Email send failed after 3 retries");
            return Err(e.into());
        }
        Ok(())
    }

    fn channel_name(&self) -> &str {
        "email"
    }
}

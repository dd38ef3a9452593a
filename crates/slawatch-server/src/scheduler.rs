use slawatch_common::clock::Clock;
use slawatch_common::types::{BreachKind, NotificationIntent, NotificationPayload};
use slawatch_notify::dispatcher::NotificationDispatcher;
use slawatch_storage::{IncidentRepository, ScanCandidate, StorageError};
use std::sync::Arc;
use tokio::time::{interval, Duration};

/// Periodic reconciliation of SLA state against the clock: one cadence
/// claims breaches, a second warns on deadlines inside the lookahead
/// window. Database state is the only coordination between instances,
/// so several schedulers may run against one database and each breach
/// is still claimed exactly once.
pub struct SlaScanScheduler {
    repo: Arc<dyn IncidentRepository>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    breach_interval_secs: u64,
    warning_interval_secs: u64,
}

impl SlaScanScheduler {
    pub fn new(
        repo: Arc<dyn IncidentRepository>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        breach_interval_secs: u64,
        warning_interval_secs: u64,
    ) -> Self {
        Self {
            repo,
            dispatcher,
            clock,
            breach_interval_secs,
            warning_interval_secs,
        }
    }

    pub async fn run(&self) {
        tracing::info!(
            breach_interval_secs = self.breach_interval_secs,
            warning_interval_secs = self.warning_interval_secs,
            "SLA scan scheduler started"
        );

        let mut breach_tick = interval(Duration::from_secs(self.breach_interval_secs));
        let mut warning_tick = interval(Duration::from_secs(self.warning_interval_secs));
        loop {
            tokio::select! {
                _ = breach_tick.tick() => {
                    if let Err(e) = self.breach_pass().await {
                        tracing::error!(error = %e, "Breach scan cycle failed");
                    }
                }
                _ = warning_tick.tick() => {
                    if let Err(e) = self.warning_pass().await {
                        tracing::error!(error = %e, "Warning scan cycle failed");
                    }
                }
            }
        }
    }

    /// One breach pass: claim every overdue SLA via the CAS write, then
    /// notify. The claim commits before the notification goes out, so a
    /// crash between the two drops the notification but never re-arms
    /// the guard.
    async fn breach_pass(&self) -> Result<(), StorageError> {
        let now = self.clock.now();
        let candidates = self.repo.find_breach_candidates(now).await?;
        if candidates.is_empty() {
            return Ok(());
        }

        let mut claimed = 0usize;
        let mut lost = 0usize;
        for candidate in candidates {
            let ScanCandidate {
                mut sla,
                incident,
                assignee,
            } = candidate;

            // The deadline to name in the notification; read before the
            // claim mutates the SLA.
            let kind = sla.breach_kind();
            if let Err(e) = sla.mark_breached(now) {
                tracing::debug!(sla_id = %sla.id, error = %e, "Candidate settled since the scan query");
                continue;
            }
            match self.repo.update_sla(&mut sla).await {
                Ok(()) => {}
                Err(StorageError::Conflict { .. }) => {
                    lost += 1;
                    tracing::debug!(sla_id = %sla.id, "Lost the breach claim race");
                    continue;
                }
                Err(e) => {
                    tracing::error!(sla_id = %sla.id, error = %e, "Failed to claim breach");
                    continue;
                }
            }
            claimed += 1;

            let deadline = match kind {
                BreachKind::Response => sla.response_deadline,
                BreachKind::Resolution => sla.effective_resolution_deadline(),
            };
            let overdue_minutes = (now - deadline).num_minutes();
            tracing::warn!(
                incident_id = %incident.id,
                breach = %kind,
                overdue_minutes,
                "SLA breached"
            );

            // Unassigned incidents keep the recorded breach, nothing to send
            let Some(assignee) = assignee else {
                tracing::debug!(incident_id = %incident.id, "Breach claimed on unassigned incident, no notification");
                continue;
            };
            let intent = NotificationIntent {
                incident_id: incident.id.clone(),
                incident_title: incident.title.clone(),
                priority: incident.priority,
                status: incident.status,
                recipient: assignee.email,
                payload: NotificationPayload::Breach {
                    breach: kind,
                    deadline,
                    overdue_minutes,
                },
            };
            if !self.dispatcher.deliver(&intent).await {
                // Claim is already durable; the breach stays recorded
                // even though this notification was dropped.
                tracing::warn!(incident_id = %incident.id, "Breach notification not delivered");
            }
        }

        tracing::info!(claimed, lost, "Breach scan pass finished");
        Ok(())
    }

    /// One warning pass: notify on SLAs whose nominal resolution deadline
    /// falls inside the priority-dependent lookahead window. Stateless,
    /// so a warning repeats on every pass until resolution or breach.
    async fn warning_pass(&self) -> Result<(), StorageError> {
        let now = self.clock.now();
        let candidates = self.repo.find_warning_candidates(now).await?;
        if candidates.is_empty() {
            return Ok(());
        }

        let found = candidates.len();
        let mut sent = 0usize;
        for candidate in candidates {
            let deadline = candidate.sla.resolution_deadline;
            let minutes_remaining = (deadline - now).num_minutes();

            let Some(assignee) = candidate.assignee else {
                tracing::debug!(
                    incident_id = %candidate.incident.id,
                    "Deadline warning on unassigned incident, no notification"
                );
                continue;
            };
            let intent = NotificationIntent {
                incident_id: candidate.incident.id.clone(),
                incident_title: candidate.incident.title.clone(),
                priority: candidate.incident.priority,
                status: candidate.incident.status,
                recipient: assignee.email,
                payload: NotificationPayload::ApproachingDeadline {
                    resolution_deadline: deadline,
                    minutes_remaining,
                },
            };
            if self.dispatcher.deliver(&intent).await {
                sent += 1;
            }
        }

        tracing::info!(found, sent, "Warning scan pass finished");
        Ok(())
    }
}

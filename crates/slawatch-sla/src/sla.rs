use crate::error::{Result, TransitionError};
use crate::policy::SlaDeadlines;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::{BreachKind, SlaStatus};

/// SLA record for exactly one incident.
///
/// Both deadlines are fixed at creation from the policy in effect at that
/// moment and never change afterwards; later priority edits on the owning
/// incident do not reach back into an existing SLA. Breach comparisons use
/// the effective deadline (nominal + accumulated pause credit), so time
/// spent paused never counts against the SLA.
///
/// `version` is the optimistic-lock counter the storage layer CAS-es on;
/// the state machine itself never touches it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sla {
    pub id: String,
    pub incident_id: String,
    pub response_deadline: DateTime<Utc>,
    pub resolution_deadline: DateTime<Utc>,
    pub status: SlaStatus,
    /// Set once, when the first response is recorded.
    pub response_at: Option<DateTime<Utc>>,
    /// Set while the SLA sits in `Paused`, cleared on resume.
    pub paused_at: Option<DateTime<Utc>>,
    /// Accumulated pause credit in whole seconds. Only ever grows.
    pub paused_duration_secs: i64,
    /// At-most-once guard for breach notification. Never cleared.
    pub breach_notified_at: Option<DateTime<Utc>>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sla {
    /// Create an active SLA whose deadlines are `now` plus the policy
    /// offsets for the owning incident's priority.
    pub fn new(
        id: String,
        incident_id: String,
        now: DateTime<Utc>,
        deadlines: SlaDeadlines,
    ) -> Self {
        Self {
            id,
            incident_id,
            response_deadline: now + Duration::hours(deadlines.response_hours),
            resolution_deadline: now + Duration::hours(deadlines.resolution_hours),
            status: SlaStatus::Active,
            response_at: None,
            paused_at: None,
            paused_duration_secs: 0,
            breach_notified_at: None,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn paused_duration(&self) -> Duration {
        Duration::seconds(self.paused_duration_secs)
    }

    /// Nominal resolution deadline shifted by all accumulated pause credit.
    /// An open pause segment is not included; it is folded on resume or on
    /// an on-time resolution.
    pub fn effective_resolution_deadline(&self) -> DateTime<Utc> {
        self.resolution_deadline + self.paused_duration()
    }

    /// Record the first response. Idempotent: a second call leaves
    /// `response_at` untouched. Only meaningful while the SLA is still
    /// live (active or paused).
    pub fn record_response(&mut self, now: DateTime<Utc>) -> Result<()> {
        match self.status {
            SlaStatus::Active | SlaStatus::Paused => {
                if self.response_at.is_none() {
                    self.response_at = Some(now);
                    self.updated_at = now;
                }
                Ok(())
            }
            from => Err(self.invalid(from, "record response on")),
        }
    }

    /// Record that the owning incident was resolved at `now`.
    ///
    /// Returns `true` when the resolution landed within the effective
    /// deadline and the SLA moved to `Met`. A late resolution leaves the
    /// status (and any open pause segment) untouched: `Met` is never
    /// granted retroactively and breach marking stays the scanner's job.
    pub fn record_resolution(&mut self, now: DateTime<Utc>) -> Result<bool> {
        match self.status {
            SlaStatus::Active | SlaStatus::Paused => {
                // Credit for an open pause segment counts toward the
                // on-time comparison even before resume folds it.
                let open_pause = match (self.status, self.paused_at) {
                    (SlaStatus::Paused, Some(paused_at)) => {
                        (now - paused_at).max(Duration::zero())
                    }
                    _ => Duration::zero(),
                };
                if now <= self.effective_resolution_deadline() + open_pause {
                    if let Some(paused_at) = self.paused_at.take() {
                        self.paused_duration_secs +=
                            (now - paused_at).num_seconds().max(0);
                    }
                    self.status = SlaStatus::Met;
                    self.updated_at = now;
                    Ok(true)
                } else {
                    tracing::debug!(
                        sla_id = %self.id,
                        "Late resolution, leaving status for the breach scanner"
                    );
                    Ok(false)
                }
            }
            from => Err(self.invalid(from, "record resolution on")),
        }
    }

    /// Freeze the SLA clock. Valid only from `Active`.
    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SlaStatus::Active {
            return Err(self.invalid(self.status, "pause"));
        }
        self.paused_at = Some(now);
        self.status = SlaStatus::Paused;
        self.updated_at = now;
        Ok(())
    }

    /// Unfreeze the SLA clock, folding the closed segment into the
    /// accumulated pause credit. Valid only from `Paused`.
    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SlaStatus::Paused {
            return Err(self.invalid(self.status, "resume"));
        }
        let paused_at = self
            .paused_at
            .take()
            .ok_or_else(|| self.invalid(SlaStatus::Paused, "resume"))?;
        self.paused_duration_secs += (now - paused_at).num_seconds().max(0);
        self.status = SlaStatus::Active;
        self.updated_at = now;
        Ok(())
    }

    /// Scanner transition: mark the SLA breached and stamp the
    /// at-most-once notification guard. Valid only from `Active`; a
    /// paused SLA's clock is frozen and `Breached`/`Met` are settled.
    pub fn mark_breached(&mut self, now: DateTime<Utc>) -> Result<()> {
        if self.status != SlaStatus::Active {
            return Err(self.invalid(self.status, "mark breached"));
        }
        self.status = SlaStatus::Breached;
        if self.breach_notified_at.is_none() {
            self.breach_notified_at = Some(now);
        }
        self.updated_at = now;
        Ok(())
    }

    /// Response deadline has passed with no response recorded.
    pub fn is_response_breached(&self, now: DateTime<Utc>) -> bool {
        self.response_at.is_none() && now > self.response_deadline
    }

    /// Effective resolution deadline has passed and the SLA was not met.
    pub fn is_resolution_breached(&self, now: DateTime<Utc>) -> bool {
        self.status != SlaStatus::Met && now > self.effective_resolution_deadline()
    }

    /// Signed time left until a deadline; negative once breached.
    pub fn time_remaining(&self, now: DateTime<Utc>, which: BreachKind) -> Duration {
        match which {
            BreachKind::Response => self.response_deadline - now,
            BreachKind::Resolution => self.effective_resolution_deadline() - now,
        }
    }

    /// Which deadline a breach notification should name. Response wins
    /// when both deadlines are blown.
    pub fn breach_kind(&self) -> BreachKind {
        if self.response_at.is_none() {
            BreachKind::Response
        } else {
            BreachKind::Resolution
        }
    }

    fn invalid(&self, from: SlaStatus, action: &'static str) -> TransitionError {
        TransitionError::InvalidSlaTransition {
            sla_id: self.id.clone(),
            from,
            action,
        }
    }
}

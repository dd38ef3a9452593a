use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::{IncidentPriority, IncidentStatus};

/// Incident record. Owns exactly one SLA, created in the same transaction.
///
/// Status writes are deliberately permissive (any target from any source);
/// the invariants live in the set-once stamps: `resolved_at` and
/// `closed_at` are written on the first entry into their status and never
/// again. Deletion is a soft marker; rows survive until the retention
/// purge cascades them away.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    pub id: String,
    pub title: String,
    pub description: String,
    pub status: IncidentStatus,
    pub priority: IncidentPriority,
    pub reporter_id: String,
    pub assignee_id: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What a status write actually changed, so the caller knows which side
/// effects (SLA resolution, notifications) fire exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusChange {
    /// `resolved_at` was stamped by this call.
    pub resolved_now: bool,
    /// `closed_at` was stamped by this call.
    pub closed_now: bool,
}

impl Incident {
    /// Create an open, unassigned incident.
    pub fn new(
        id: String,
        title: String,
        description: String,
        priority: IncidentPriority,
        reporter_id: String,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title,
            description,
            status: IncidentStatus::Open,
            priority,
            reporter_id,
            assignee_id: None,
            resolved_at: None,
            closed_at: None,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Set the assignee. Assignment to an open incident implies work has
    /// started, so the status auto-advances to `InProgress`; in any other
    /// status only the assignee changes.
    pub fn assign(&mut self, assignee_id: String, now: DateTime<Utc>) {
        self.assignee_id = Some(assignee_id);
        if self.status == IncidentStatus::Open {
            self.status = IncidentStatus::InProgress;
        }
        self.updated_at = now;
    }

    /// Write a new status. Every target is accepted; the returned
    /// [`StatusChange`] reports whether this call was the first entry into
    /// `Resolved` or `Closed` (stamping the timestamp), which is what the
    /// service layer keys SLA resolution and notifications on. Repeating
    /// a write is a no-op beyond the status field itself.
    pub fn set_status(&mut self, new_status: IncidentStatus, now: DateTime<Utc>) -> StatusChange {
        let mut change = StatusChange::default();
        if new_status == IncidentStatus::Resolved && self.resolved_at.is_none() {
            self.resolved_at = Some(now);
            change.resolved_now = true;
        }
        if new_status == IncidentStatus::Closed && self.closed_at.is_none() {
            self.closed_at = Some(now);
            change.closed_now = true;
        }
        self.status = new_status;
        self.updated_at = now;
        change
    }

    pub fn is_resolved(&self) -> bool {
        self.resolved_at.is_some()
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

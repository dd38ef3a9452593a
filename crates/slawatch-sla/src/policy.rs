use serde::{Deserialize, Serialize};
use slawatch_common::types::IncidentPriority;

/// Deadline offsets for one priority bucket, in wall-clock hours from
/// SLA creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDeadlines {
    pub response_hours: i64,
    pub resolution_hours: i64,
}

impl SlaDeadlines {
    pub fn new(response_hours: i64, resolution_hours: i64) -> Self {
        Self {
            response_hours,
            resolution_hours,
        }
    }
}

/// Priority → deadline policy table.
///
/// The lookup is pure and total: every [`IncidentPriority`] maps to a
/// bucket, and raw strings from outside the enum are funneled through
/// [`IncidentPriority::parse_lenient`], which lands on `Medium`. A lookup
/// can therefore never fail, regardless of what older rows or foreign
/// callers hand in.
///
/// # Examples
///
/// ```
/// use slawatch_common::types::IncidentPriority;
/// use slawatch_sla::policy::SlaPolicy;
///
/// let policy = SlaPolicy::default();
/// assert_eq!(policy.deadlines_for(IncidentPriority::Critical).response_hours, 1);
///
/// // Unknown raw values degrade to the medium bucket.
/// let fallback = policy.deadlines_for(IncidentPriority::parse_lenient("urgent"));
/// assert_eq!(fallback, policy.deadlines_for(IncidentPriority::Medium));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaPolicy {
    pub critical: SlaDeadlines,
    pub high: SlaDeadlines,
    pub medium: SlaDeadlines,
    pub low: SlaDeadlines,
}

impl Default for SlaPolicy {
    fn default() -> Self {
        Self {
            critical: SlaDeadlines::new(1, 4),
            high: SlaDeadlines::new(4, 24),
            medium: SlaDeadlines::new(8, 72),
            low: SlaDeadlines::new(24, 168),
        }
    }
}

impl SlaPolicy {
    pub fn deadlines_for(&self, priority: IncidentPriority) -> SlaDeadlines {
        match priority {
            IncidentPriority::Critical => self.critical,
            IncidentPriority::High => self.high,
            IncidentPriority::Medium => self.medium,
            IncidentPriority::Low => self.low,
        }
    }
}

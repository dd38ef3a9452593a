//! Persistence layer for incidents, SLA records, users, comments and
//! attachments.
//!
//! A single SQLite database in WAL mode, accessed through SeaORM, backs the
//! whole incident domain. [`store::IncidentStore`] is the unified access
//! layer; schema migrations run automatically on connect.

pub mod entities;
pub mod error;
pub mod store;

#[cfg(test)]
mod tests;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use slawatch_sla::incident::Incident;
use slawatch_sla::sla::Sla;

pub use error::{Result, StorageError};
pub use store::{IncidentFilter, IncidentStats, IncidentStore, ScanCandidate};

/// Persistence seam shared by the HTTP service and the SLA scan scheduler.
///
/// Implementations must be safe to share across threads (`Send + Sync`)
/// because the store is hit concurrently by request handlers and the
/// background scan loops.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Loads a live incident by ID; soft-deleted rows read as absent.
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>>;

    /// Lists live incidents matching the filter, newest first, together
    /// with the total row count before pagination.
    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Incident>, u64)>;

    /// Persists a new incident and its SLA record in one transaction.
    async fn save_incident_and_sla(&self, incident: &Incident, sla: &Sla) -> Result<()>;

    /// Writes back a modified incident.
    async fn update_incident(&self, incident: &Incident) -> Result<()>;

    /// Writes back a modified SLA record. Fails with
    /// [`StorageError::Conflict`] when a concurrent writer advanced the
    /// record first; on success the caller's version counter is bumped.
    async fn update_sla(&self, sla: &mut Sla) -> Result<()>;

    /// Active SLAs whose response or resolution deadline has passed and
    /// that have not been breach-notified yet.
    async fn find_breach_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>>;

    /// Active SLAs whose resolution deadline falls inside the
    /// priority-dependent warning window.
    async fn find_warning_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>>;
}

#[async_trait]
impl IncidentRepository for IncidentStore {
    async fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
        IncidentStore::get_incident(self, id).await
    }

    async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Incident>, u64)> {
        IncidentStore::list_incidents(self, filter, limit, offset).await
    }

    async fn save_incident_and_sla(&self, incident: &Incident, sla: &Sla) -> Result<()> {
        IncidentStore::save_incident_and_sla(self, incident, sla).await
    }

    async fn update_incident(&self, incident: &Incident) -> Result<()> {
        IncidentStore::update_incident(self, incident).await
    }

    async fn update_sla(&self, sla: &mut Sla) -> Result<()> {
        IncidentStore::update_sla(self, sla).await
    }

    async fn find_breach_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>> {
        IncidentStore::find_breach_candidates(self, now).await
    }

    async fn find_warning_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>> {
        IncidentStore::find_warning_candidates(self, now).await
    }
}

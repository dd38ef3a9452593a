use crate::config::ServerConfig;
use crate::service::IncidentService;
use chrono::{DateTime, Utc};
use slawatch_storage::IncidentStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<IncidentService>,
    pub store: Arc<IncidentStore>,
    pub start_time: DateTime<Utc>,
    pub config: Arc<ServerConfig>,
}

use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter};
use slawatch_common::types::{IncidentPriority, SlaStatus, User};
use slawatch_sla::incident::Incident;
use slawatch_sla::sla::Sla;

use crate::entities::sla::{self, Column, Entity};
use crate::error::{Result, StorageError};
use crate::store::IncidentStore;

/// Scanner candidate: an SLA joined to its live incident and the assignee
/// the notification would go to. `None` for unassigned incidents; the
/// scanner still applies the transition, it just has nobody to notify.
#[derive(Debug, Clone)]
pub struct ScanCandidate {
    pub sla: Sla,
    pub incident: Incident,
    pub assignee: Option<User>,
}

pub(crate) fn to_sla(m: sla::Model) -> Sla {
    Sla {
        id: m.id,
        incident_id: m.incident_id,
        response_deadline: m.response_deadline,
        resolution_deadline: m.resolution_deadline,
        status: m.status.parse().unwrap_or(SlaStatus::Active),
        response_at: m.response_at,
        paused_at: m.paused_at,
        paused_duration_secs: m.paused_duration_secs,
        breach_notified_at: m.breach_notified_at,
        version: m.version,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

pub(crate) fn to_active(s: &Sla) -> sla::ActiveModel {
    sla::ActiveModel {
        id: Set(s.id.clone()),
        incident_id: Set(s.incident_id.clone()),
        response_deadline: Set(s.response_deadline),
        resolution_deadline: Set(s.resolution_deadline),
        status: Set(s.status.to_string()),
        response_at: Set(s.response_at),
        paused_at: Set(s.paused_at),
        paused_duration_secs: Set(s.paused_duration_secs),
        breach_notified_at: Set(s.breach_notified_at),
        version: Set(s.version),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
    }
}

impl IncidentStore {
    /// 按事件 ID 取其 SLA（一对一）。
    pub async fn get_sla_for_incident(&self, incident_id: &str) -> Result<Option<Sla>> {
        let model = Entity::find()
            .filter(Column::IncidentId.eq(incident_id))
            .one(self.db())
            .await?;
        Ok(model.map(to_sla))
    }

    /// CAS 回写 SLA：仅当行内 version 仍等于读取时的值才生效。
    ///
    /// 命中后把调用方副本的 version 一并推进；丢失竞争返回
    /// [`StorageError::Conflict`]，由调用方决定重试还是放弃。
    /// 两个 deadline 建档后不可变，因此从不回写。
    pub async fn update_sla(&self, s: &mut Sla) -> Result<()> {
        let read_version = s.version;
        let res = Entity::update_many()
            .col_expr(Column::Status, Expr::value(s.status.to_string()))
            .col_expr(Column::ResponseAt, Expr::value(s.response_at))
            .col_expr(Column::PausedAt, Expr::value(s.paused_at))
            .col_expr(
                Column::PausedDurationSecs,
                Expr::value(s.paused_duration_secs),
            )
            .col_expr(Column::BreachNotifiedAt, Expr::value(s.breach_notified_at))
            .col_expr(Column::UpdatedAt, Expr::value(s.updated_at))
            .col_expr(Column::Version, Expr::value(read_version + 1))
            .filter(Column::Id.eq(&s.id))
            .filter(Column::Version.eq(read_version))
            .exec(self.db())
            .await?;

        if res.rows_affected == 0 {
            return Err(StorageError::Conflict {
                entity: "sla",
                id: s.id.clone(),
            });
        }
        s.version = read_version + 1;
        Ok(())
    }

    /// 违约扫描候选集：status=active 且尚未打过违约通知标记的 SLA，
    /// 精确的 deadline 判断与事件状态过滤在内存里完成。
    pub async fn find_breach_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>> {
        let models = Entity::find()
            .filter(Column::Status.eq(SlaStatus::Active.to_string()))
            .filter(Column::BreachNotifiedAt.is_null())
            .all(self.db())
            .await?;

        // Candidate volume is bounded by the number of live active SLAs,
        // so the per-row incident/assignee lookups stay cheap.
        let mut candidates = Vec::new();
        for model in models {
            let sla_row = to_sla(model);
            let Some(incident_row) = self.get_incident(&sla_row.incident_id).await? else {
                // Soft-deleted or vanished incident: nothing to notify on.
                continue;
            };
            let response_due = sla_row.is_response_breached(now);
            let resolution_due =
                !incident_row.is_resolved() && sla_row.is_resolution_breached(now);
            if !(response_due || resolution_due) {
                continue;
            }
            let assignee = self.scan_assignee(&incident_row).await?;
            candidates.push(ScanCandidate {
                sla: sla_row,
                incident: incident_row,
                assignee,
            });
        }
        Ok(candidates)
    }

    /// 预警扫描候选集：status=active、事件未解决、名义解决 deadline
    /// 落在按优先级决定的前瞻窗口 (now, now+1h] / (now, now+4h] 内。
    pub async fn find_warning_candidates(&self, now: DateTime<Utc>) -> Result<Vec<ScanCandidate>> {
        let models = Entity::find()
            .filter(Column::Status.eq(SlaStatus::Active.to_string()))
            .all(self.db())
            .await?;

        let mut candidates = Vec::new();
        for model in models {
            let sla_row = to_sla(model);
            let Some(incident_row) = self.get_incident(&sla_row.incident_id).await? else {
                continue;
            };
            if incident_row.is_resolved() {
                continue;
            }
            let window = if incident_row.priority >= IncidentPriority::High {
                Duration::hours(1)
            } else {
                Duration::hours(4)
            };
            let deadline = sla_row.resolution_deadline;
            if !(deadline > now && deadline <= now + window) {
                continue;
            }
            let assignee = self.scan_assignee(&incident_row).await?;
            candidates.push(ScanCandidate {
                sla: sla_row,
                incident: incident_row,
                assignee,
            });
        }
        Ok(candidates)
    }

    /// 通知对象解析：仅取 assignee 对应的用户行，未指派返回 None。
    async fn scan_assignee(&self, incident: &Incident) -> Result<Option<User>> {
        match &incident.assignee_id {
            Some(id) => self.get_user(id).await,
            None => Ok(None),
        }
    }
}

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, Condition, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};
use serde::Serialize;
use slawatch_common::types::{IncidentPriority, IncidentStatus};
use slawatch_sla::incident::Incident;
use slawatch_sla::sla::Sla;

use crate::entities::incident::{self, Column, Entity};
use crate::entities::{attachment, comment, sla};
use crate::error::{Result, StorageError};
use crate::store::IncidentStore;

/// 事件列表过滤器
#[derive(Debug, Clone, Default)]
pub struct IncidentFilter {
    pub status_eq: Option<IncidentStatus>,
    pub priority_eq: Option<IncidentPriority>,
    pub assignee_id_eq: Option<String>,
    pub reporter_id_eq: Option<String>,
    /// 标题 / 描述模糊搜索（大小写不敏感）
    pub search: Option<String>,
}

/// 事件统计汇总（不含已软删除行）
#[derive(Debug, Clone, Serialize)]
pub struct IncidentStats {
    pub total: u64,
    pub open: u64,
    pub in_progress: u64,
    pub resolved: u64,
    pub closed: u64,
    pub critical: u64,
    pub high: u64,
    pub medium: u64,
    pub low: u64,
}

pub(crate) fn to_incident(m: incident::Model) -> Incident {
    Incident {
        id: m.id,
        title: m.title,
        description: m.description,
        // Rows are only written from the enums; foreign values degrade
        // conservatively instead of failing the whole read.
        status: m.status.parse().unwrap_or(IncidentStatus::Open),
        priority: IncidentPriority::parse_lenient(&m.priority),
        reporter_id: m.reporter_id,
        assignee_id: m.assignee_id,
        resolved_at: m.resolved_at,
        closed_at: m.closed_at,
        deleted_at: m.deleted_at,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn to_active(i: &Incident) -> incident::ActiveModel {
    incident::ActiveModel {
        id: Set(i.id.clone()),
        title: Set(i.title.clone()),
        description: Set(i.description.clone()),
        status: Set(i.status.to_string()),
        priority: Set(i.priority.to_string()),
        reporter_id: Set(i.reporter_id.clone()),
        assignee_id: Set(i.assignee_id.clone()),
        resolved_at: Set(i.resolved_at),
        closed_at: Set(i.closed_at),
        deleted_at: Set(i.deleted_at),
        created_at: Set(i.created_at),
        updated_at: Set(i.updated_at),
    }
}

impl IncidentStore {
    /// 在同一事务里写入事件与其 SLA（二者要么都落库，要么都不落）。
    pub async fn save_incident_and_sla(&self, incident_row: &Incident, sla_row: &Sla) -> Result<()> {
        let txn = self.db.begin().await?;
        to_active(incident_row).insert(&txn).await?;
        super::sla::to_active(sla_row).insert(&txn).await?;
        txn.commit().await?;
        Ok(())
    }

    /// 按 ID 取事件，已软删除的行视为不存在。
    pub async fn get_incident(&self, id: &str) -> Result<Option<Incident>> {
        let model = Entity::find_by_id(id)
            .filter(Column::DeletedAt.is_null())
            .one(self.db())
            .await?;
        Ok(model.map(to_incident))
    }

    /// 条件分页查询事件，返回 (行, 总数)，均不含软删除行。
    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Incident>, u64)> {
        let mut q = Entity::find().filter(Column::DeletedAt.is_null());
        if let Some(status) = filter.status_eq {
            q = q.filter(Column::Status.eq(status.to_string()));
        }
        if let Some(priority) = filter.priority_eq {
            q = q.filter(Column::Priority.eq(priority.to_string()));
        }
        if let Some(assignee) = &filter.assignee_id_eq {
            q = q.filter(Column::AssigneeId.eq(assignee));
        }
        if let Some(reporter) = &filter.reporter_id_eq {
            q = q.filter(Column::ReporterId.eq(reporter));
        }
        if let Some(search) = &filter.search {
            let pattern = search.trim();
            if !pattern.is_empty() {
                q = q.filter(
                    Condition::any()
                        .add(Column::Title.contains(pattern))
                        .add(Column::Description.contains(pattern)),
                );
            }
        }

        let total = q.clone().count(self.db()).await?;
        let rows = q
            .order_by(Column::CreatedAt, Order::Desc)
            .limit(limit as u64)
            .offset(offset as u64)
            .all(self.db())
            .await?;
        Ok((rows.into_iter().map(to_incident).collect(), total))
    }

    /// 整行回写事件。行不存在时返回 NotFound。
    pub async fn update_incident(&self, incident_row: &Incident) -> Result<()> {
        match to_active(incident_row).update(self.db()).await {
            Ok(_) => Ok(()),
            Err(sea_orm::DbErr::RecordNotUpdated) => Err(StorageError::NotFound {
                entity: "incident",
                id: incident_row.id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// 软删除：打上 deleted_at 标记。已删除或不存在时返回 false。
    pub async fn soft_delete_incident(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        let res = Entity::update_many()
            .col_expr(Column::DeletedAt, Expr::value(Some(now)))
            .col_expr(Column::UpdatedAt, Expr::value(now))
            .filter(Column::Id.eq(id))
            .filter(Column::DeletedAt.is_null())
            .exec(self.db())
            .await?;
        Ok(res.rows_affected > 0)
    }

    /// 级联硬删除：事件连同 SLA、备注、附件在一个事务里移除。
    /// 返回是否确实删掉了事件行。
    pub async fn cascade_delete_incident(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin().await?;
        attachment::Entity::delete_many()
            .filter(attachment::Column::IncidentId.eq(id))
            .exec(&txn)
            .await?;
        comment::Entity::delete_many()
            .filter(comment::Column::IncidentId.eq(id))
            .exec(&txn)
            .await?;
        sla::Entity::delete_many()
            .filter(sla::Column::IncidentId.eq(id))
            .exec(&txn)
            .await?;
        let res = Entity::delete_many()
            .filter(Column::Id.eq(id))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        Ok(res.rows_affected > 0)
    }

    /// 清理软删除超过保留期的事件（逐个级联删除，各自独立提交）。
    /// 返回清理掉的事件数。
    pub async fn purge_soft_deleted(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let expired: Vec<String> = Entity::find()
            .filter(Column::DeletedAt.is_not_null())
            .filter(Column::DeletedAt.lt(cutoff))
            .all(self.db())
            .await?
            .into_iter()
            .map(|m| m.id)
            .collect();

        let mut purged = 0u64;
        for id in expired {
            if self.cascade_delete_incident(&id).await? {
                purged += 1;
            }
        }
        Ok(purged)
    }

    /// 事件统计汇总。
    pub async fn incident_stats(&self) -> Result<IncidentStats> {
        let live = Entity::find().filter(Column::DeletedAt.is_null());
        let count_status = |s: IncidentStatus| {
            live.clone().filter(Column::Status.eq(s.to_string()))
        };
        let count_priority = |p: IncidentPriority| {
            live.clone().filter(Column::Priority.eq(p.to_string()))
        };

        Ok(IncidentStats {
            total: live.clone().count(self.db()).await?,
            open: count_status(IncidentStatus::Open).count(self.db()).await?,
            in_progress: count_status(IncidentStatus::InProgress)
                .count(self.db())
                .await?,
            resolved: count_status(IncidentStatus::Resolved)
                .count(self.db())
                .await?,
            closed: count_status(IncidentStatus::Closed)
                .count(self.db())
                .await?,
            critical: count_priority(IncidentPriority::Critical)
                .count(self.db())
                .await?,
            high: count_priority(IncidentPriority::High)
                .count(self.db())
                .await?,
            medium: count_priority(IncidentPriority::Medium)
                .count(self.db())
                .await?,
            low: count_priority(IncidentPriority::Low)
                .count(self.db())
                .await?,
        })
    }
}

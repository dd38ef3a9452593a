use chrono::{DateTime, Utc};
use slawatch_common::clock::Clock;
use slawatch_common::id;
use slawatch_common::types::{
    Attachment, Comment, IncidentPriority, IncidentStatus, NotificationIntent,
    NotificationPayload, User,
};
use slawatch_notify::dispatcher::NotificationDispatcher;
use slawatch_sla::incident::Incident;
use slawatch_sla::policy::SlaPolicy;
use slawatch_sla::error::TransitionError;
use slawatch_sla::sla::Sla;
use slawatch_storage::{IncidentFilter, IncidentStats, IncidentStore, StorageError};
use std::sync::Arc;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Request-scoped failures, one variant per HTTP outcome class.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("{entity} '{id}' was modified concurrently, retry the request")]
    Conflict { entity: &'static str, id: String },
    #[error(transparent)]
    Storage(StorageError),
}

impl From<StorageError> for ServiceError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound { entity, id } => Self::NotFound { entity, id },
            StorageError::Conflict { entity, id } => Self::Conflict { entity, id },
            other => Self::Storage(other),
        }
    }
}

/// Orchestrates one API request against store, policy, clock and
/// notification dispatcher. Holds no mutable state of its own; every
/// operation is an independent read-modify-write through the store.
pub struct IncidentService {
    store: Arc<IncidentStore>,
    dispatcher: Arc<NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    policy: SlaPolicy,
}

impl IncidentService {
    pub fn new(
        store: Arc<IncidentStore>,
        dispatcher: Arc<NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        policy: SlaPolicy,
    ) -> Self {
        Self {
            store,
            dispatcher,
            clock,
            policy,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// 建单：校验后在一个事务里落事件 + SLA，deadline 按优先级策略表
    /// 从建单时刻起算。成功后给 reporter 发 created 通知。
    pub async fn create_incident(
        &self,
        title: &str,
        description: &str,
        priority: IncidentPriority,
        reporter_id: &str,
    ) -> Result<(Incident, Sla)> {
        let title = title.trim();
        if title.is_empty() {
            return Err(ServiceError::Validation("title must not be empty".into()));
        }
        let description = description.trim();
        if description.is_empty() {
            return Err(ServiceError::Validation(
                "description must not be empty".into(),
            ));
        }
        let reporter = self.require_user(reporter_id, "reporter").await?;

        let now = self.clock.now();
        let incident = Incident::new(
            id::next_id(),
            title.to_string(),
            description.to_string(),
            priority,
            reporter.id.clone(),
            now,
        );
        let sla = Sla::new(
            id::next_id(),
            incident.id.clone(),
            now,
            self.policy.deadlines_for(priority),
        );
        self.store.save_incident_and_sla(&incident, &sla).await?;
        tracing::info!(
            incident_id = %incident.id,
            priority = %incident.priority,
            response_deadline = %sla.response_deadline,
            resolution_deadline = %sla.resolution_deadline,
            "Incident created"
        );

        self.dispatch(NotificationIntent {
            incident_id: incident.id.clone(),
            incident_title: incident.title.clone(),
            priority: incident.priority,
            status: incident.status,
            recipient: reporter.email,
            payload: NotificationPayload::Created {
                response_deadline: sla.response_deadline,
                resolution_deadline: sla.resolution_deadline,
            },
        });

        Ok((incident, sla))
    }

    pub async fn get_incident(&self, id: &str) -> Result<(Incident, Option<Sla>)> {
        let incident = self
            .store
            .get_incident(id)
            .await?
            .ok_or_else(|| not_found("incident", id))?;
        let sla = self.store.get_sla_for_incident(id).await?;
        Ok((incident, sla))
    }

    pub async fn list_incidents(
        &self,
        filter: &IncidentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<(Vec<Incident>, u64)> {
        Ok(self.store.list_incidents(filter, limit, offset).await?)
    }

    /// 编辑标题 / 描述 / 优先级。优先级调整只影响后续建档的事件，
    /// 已有 SLA 的 deadline 不随之变化。
    pub async fn update_incident(
        &self,
        id: &str,
        title: Option<String>,
        description: Option<String>,
        priority: Option<IncidentPriority>,
    ) -> Result<Incident> {
        let mut incident = self
            .store
            .get_incident(id)
            .await?
            .ok_or_else(|| not_found("incident", id))?;

        if let Some(title) = title {
            let title = title.trim().to_string();
            if title.is_empty() {
                return Err(ServiceError::Validation("title must not be empty".into()));
            }
            incident.title = title;
        }
        if let Some(description) = description {
            let description = description.trim().to_string();
            if description.is_empty() {
                return Err(ServiceError::Validation(
                    "description must not be empty".into(),
                ));
            }
            incident.description = description;
        }
        if let Some(priority) = priority {
            incident.priority = priority;
        }
        incident.updated_at = self.clock.now();

        self.store.update_incident(&incident).await?;
        Ok(incident)
    }

    /// 指派处理人；open 状态会随之进入 in_progress。指派成功后给
    /// assignee 发一条 created 通知（带 deadline，作为接手提醒）。
    pub async fn assign_incident(&self, id: &str, assignee_id: &str) -> Result<Incident> {
        let assignee = self.require_user(assignee_id, "assignee").await?;
        let mut incident = self
            .store
            .get_incident(id)
            .await?
            .ok_or_else(|| not_found("incident", id))?;

        let now = self.clock.now();
        incident.assign(assignee.id.clone(), now);
        self.store.update_incident(&incident).await?;
        tracing::info!(incident_id = %incident.id, assignee_id = %assignee.id, "Incident assigned");

        if let Some(sla) = self.store.get_sla_for_incident(id).await? {
            self.dispatch(NotificationIntent {
                incident_id: incident.id.clone(),
                incident_title: incident.title.clone(),
                priority: incident.priority,
                status: incident.status,
                recipient: assignee.email,
                payload: NotificationPayload::Created {
                    response_deadline: sla.response_deadline,
                    resolution_deadline: sla.resolution_deadline,
                },
            });
        }

        Ok(incident)
    }

    /// 写入新状态。首次进入 resolved 时联动 SLA：在 deadline 内则收敛
    /// 为 met，超时或已 breached 则保持原状；随后给 reporter 发
    /// resolved 通知。SLA 的收敛先于事件行落库，丢失 CAS 竞争时整个
    /// 操作以冲突失败，事件行保持原样可安全重试。
    pub async fn set_status(&self, id: &str, new_status: IncidentStatus) -> Result<Incident> {
        let mut incident = self
            .store
            .get_incident(id)
            .await?
            .ok_or_else(|| not_found("incident", id))?;

        let now = self.clock.now();
        let change = incident.set_status(new_status, now);

        let mut sla_met = false;
        if change.resolved_now {
            if let Some(mut sla) = self.store.get_sla_for_incident(id).await? {
                match sla.record_resolution(now) {
                    Ok(met) => {
                        self.store.update_sla(&mut sla).await?;
                        sla_met = met;
                    }
                    Err(e) => {
                        // Breached or already-met SLA is settled; the
                        // incident resolution itself still proceeds.
                        tracing::debug!(incident_id = %id, error = %e, "SLA left unchanged on resolution");
                    }
                }
            }
        }

        self.store.update_incident(&incident).await?;
        tracing::info!(incident_id = %incident.id, status = %incident.status, "Incident status updated");

        if change.resolved_now {
            let resolution_minutes = (now - incident.created_at).num_minutes();
            if let Some(reporter) = self.store.get_user(&incident.reporter_id).await? {
                self.dispatch(NotificationIntent {
                    incident_id: incident.id.clone(),
                    incident_title: incident.title.clone(),
                    priority: incident.priority,
                    status: incident.status,
                    recipient: reporter.email,
                    payload: NotificationPayload::Resolved {
                        resolved_at: now,
                        sla_met,
                        resolution_minutes,
                    },
                });
            }
        }

        Ok(incident)
    }

    /// 软删除；行保留到保留期满由后台任务级联清除。
    pub async fn delete_incident(&self, id: &str) -> Result<()> {
        let now = self.clock.now();
        if !self.store.soft_delete_incident(id, now).await? {
            return Err(not_found("incident", id));
        }
        tracing::info!(incident_id = %id, "Incident soft-deleted");
        Ok(())
    }

    pub async fn get_sla(&self, incident_id: &str) -> Result<Sla> {
        // 404 for a soft-deleted incident even though its SLA row remains
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        self.store
            .get_sla_for_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("sla", incident_id))
    }

    /// 记录首次响应。幂等：重复调用保留最早的时间戳。
    pub async fn record_response(&self, incident_id: &str) -> Result<Sla> {
        self.apply_sla_transition(incident_id, |sla, now| sla.record_response(now))
            .await
    }

    /// 暂停 SLA 计时（如等待客户回复）。
    pub async fn pause_sla(&self, incident_id: &str) -> Result<Sla> {
        self.apply_sla_transition(incident_id, |sla, now| sla.pause(now))
            .await
    }

    /// 恢复计时，把暂停时长折入 pause credit。
    pub async fn resume_sla(&self, incident_id: &str) -> Result<Sla> {
        self.apply_sla_transition(incident_id, |sla, now| sla.resume(now))
            .await
    }

    async fn apply_sla_transition<F>(&self, incident_id: &str, apply: F) -> Result<Sla>
    where
        F: FnOnce(&mut Sla, DateTime<Utc>) -> std::result::Result<(), TransitionError>,
    {
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        let mut sla = self
            .store
            .get_sla_for_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("sla", incident_id))?;

        apply(&mut sla, self.clock.now())?;
        self.store.update_sla(&mut sla).await?;
        Ok(sla)
    }

    pub async fn incident_stats(&self) -> Result<IncidentStats> {
        Ok(self.store.incident_stats().await?)
    }

    pub async fn add_comment(
        &self,
        incident_id: &str,
        author_id: &str,
        content: &str,
        is_internal: bool,
    ) -> Result<Comment> {
        if content.trim().is_empty() {
            return Err(ServiceError::Validation("content must not be empty".into()));
        }
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        let author = self.require_user(author_id, "author").await?;

        let now = self.clock.now();
        let comment = Comment {
            id: id::next_id(),
            incident_id: incident_id.to_string(),
            author_id: author.id,
            content: content.trim().to_string(),
            is_internal,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_comment(&comment).await?;
        Ok(comment)
    }

    pub async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>> {
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        Ok(self.store.list_comments(incident_id).await?)
    }

    /// 登记附件元数据。文件本体不经过这条链路，只记录预期落盘路径。
    pub async fn register_attachment(
        &self,
        incident_id: &str,
        filename: &str,
        file_size: i64,
        content_type: Option<String>,
        uploaded_by: &str,
    ) -> Result<Attachment> {
        if filename.trim().is_empty() {
            return Err(ServiceError::Validation(
                "filename must not be empty".into(),
            ));
        }
        if file_size < 0 {
            return Err(ServiceError::Validation(
                "file_size must not be negative".into(),
            ));
        }
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        let uploader = self.require_user(uploaded_by, "uploader").await?;

        let attachment_id = id::next_id();
        let filename = filename.trim().to_string();
        let attachment = Attachment {
            file_path: format!("uploads/{attachment_id}_{filename}"),
            id: attachment_id,
            incident_id: incident_id.to_string(),
            filename,
            file_size,
            content_type,
            uploaded_by: uploader.id,
            created_at: self.clock.now(),
        };
        self.store.insert_attachment(&attachment).await?;
        Ok(attachment)
    }

    pub async fn list_attachments(&self, incident_id: &str) -> Result<Vec<Attachment>> {
        self.store
            .get_incident(incident_id)
            .await?
            .ok_or_else(|| not_found("incident", incident_id))?;
        Ok(self.store.list_attachments(incident_id).await?)
    }

    pub async fn create_user(
        &self,
        email: &str,
        username: &str,
        full_name: Option<String>,
    ) -> Result<User> {
        let email = email.trim();
        if !email.contains('@') {
            return Err(ServiceError::Validation(format!(
                "'{email}' is not a valid email address"
            )));
        }
        let username = username.trim();
        if username.is_empty() {
            return Err(ServiceError::Validation(
                "username must not be empty".into(),
            ));
        }
        if self.store.find_user_by_email(email).await?.is_some() {
            return Err(ServiceError::Validation(format!(
                "email '{email}' is already registered"
            )));
        }

        let now = self.clock.now();
        let user = User {
            id: id::next_id(),
            email: email.to_string(),
            username: username.to_string(),
            full_name,
            active: true,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, email = %user.email, "User created");
        Ok(user)
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.store.list_users().await?)
    }

    pub async fn get_user(&self, id: &str) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| not_found("user", id))
    }

    async fn require_user(&self, id: &str, role: &str) -> Result<User> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| ServiceError::Validation(format!("{role} '{id}' does not exist")))
    }

    /// Delivery runs detached from the request: the state change is
    /// already committed and channel failures are logged by the
    /// dispatcher itself.
    fn dispatch(&self, intent: NotificationIntent) {
        let dispatcher = self.dispatcher.clone();
        tokio::spawn(async move {
            let _ = dispatcher.deliver(&intent).await;
        });
    }
}

fn not_found(entity: &'static str, id: &str) -> ServiceError {
    ServiceError::NotFound {
        entity,
        id: id.to_string(),
    }
}

use crate::api::pagination::PaginationParams;
use crate::api::slas::SlaResponse;
use crate::api::{
    error_response, service_error_response, success_empty_response, success_paginated_response,
    success_response,
};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::{IncidentPriority, IncidentStatus};
use slawatch_sla::incident::Incident;
use slawatch_storage::{IncidentFilter, IncidentStats};
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 事件信息
#[derive(Serialize, ToSchema)]
pub struct IncidentResponse {
    /// 事件唯一标识
    pub id: String,
    /// 标题
    pub title: String,
    /// 描述
    pub description: String,
    /// 状态（open / in_progress / resolved / closed）
    pub status: String,
    /// 优先级（critical / high / medium / low）
    pub priority: String,
    /// 报告人用户 ID
    pub reporter_id: String,
    /// 处理人用户 ID（未指派时为空）
    pub assignee_id: Option<String>,
    /// 首次进入 resolved 的时间
    pub resolved_at: Option<DateTime<Utc>>,
    /// 首次进入 closed 的时间
    pub closed_at: Option<DateTime<Utc>>,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<Incident> for IncidentResponse {
    fn from(i: Incident) -> Self {
        Self {
            id: i.id,
            title: i.title,
            description: i.description,
            status: i.status.to_string(),
            priority: i.priority.to_string(),
            reporter_id: i.reporter_id,
            assignee_id: i.assignee_id,
            resolved_at: i.resolved_at,
            closed_at: i.closed_at,
            created_at: i.created_at,
            updated_at: i.updated_at,
        }
    }
}

/// 事件详情（含 SLA 档案）
#[derive(Serialize, ToSchema)]
pub struct IncidentDetailResponse {
    pub incident: IncidentResponse,
    /// 事件的 SLA 档案（历史数据可能缺失）
    pub sla: Option<SlaResponse>,
}

/// 事件统计汇总
#[derive(Serialize, ToSchema)]
pub struct StatsResponse {
    /// 存活事件总数
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

impl From<IncidentStats> for StatsResponse {
    fn from(s: IncidentStats) -> Self {
        Self {
            total: s.total,
            open: s.open,
            in_progress: s.in_progress,
            resolved: s.resolved,
            closed: s.closed,
            critical: s.critical,
            high: s.high,
            medium: s.medium,
            low: s.low,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateIncidentRequest {
    title: String,
    description: String,
    /// 优先级；无法识别的值落到 medium
    priority: String,
    reporter_id: String,
}

#[derive(Deserialize, ToSchema)]
struct UpdateIncidentRequest {
    title: Option<String>,
    description: Option<String>,
    /// 优先级调整；不影响已建档 SLA 的 deadline
    priority: Option<String>,
}

#[derive(Deserialize, ToSchema)]
struct AssignIncidentRequest {
    assignee_id: String,
}

#[derive(Deserialize, ToSchema)]
struct SetStatusRequest {
    /// 目标状态（open / in_progress / resolved / closed）
    status: String,
}

/// 事件列表查询参数
#[derive(Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
struct IncidentListParams {
    /// 状态精确匹配
    #[param(required = false, rename = "status__eq")]
    #[serde(rename = "status__eq")]
    status_eq: Option<String>,
    /// 优先级精确匹配
    #[param(required = false, rename = "priority__eq")]
    #[serde(rename = "priority__eq")]
    priority_eq: Option<String>,
    /// 处理人精确匹配
    #[param(required = false, rename = "assignee_id__eq")]
    #[serde(rename = "assignee_id__eq")]
    assignee_id_eq: Option<String>,
    /// 报告人精确匹配
    #[param(required = false, rename = "reporter_id__eq")]
    #[serde(rename = "reporter_id__eq")]
    reporter_id_eq: Option<String>,
    /// 标题 / 描述模糊搜索（大小写不敏感）
    #[param(required = false)]
    search: Option<String>,
}

impl IncidentListParams {
    /// Filter values are parsed strictly: a typo'd status should fail
    /// loudly instead of silently matching nothing.
    fn to_filter(&self) -> Result<IncidentFilter, String> {
        let status_eq = match &self.status_eq {
            Some(s) => Some(s.parse::<IncidentStatus>()?),
            None => None,
        };
        let priority_eq = match &self.priority_eq {
            Some(s) => Some(s.parse::<IncidentPriority>()?),
            None => None,
        };
        Ok(IncidentFilter {
            status_eq,
            priority_eq,
            assignee_id_eq: self.assignee_id_eq.clone(),
            reporter_id_eq: self.reporter_id_eq.clone(),
            search: self.search.clone(),
        })
    }
}

/// 创建事件。SLA 档案同步建立，deadline 由优先级策略表决定。
#[utoipa::path(
    post,
    path = "/v1/incidents",
    tag = "Incidents",
    request_body = CreateIncidentRequest,
    responses(
        (status = 201, description = "事件已创建", body = IncidentDetailResponse),
        (status = 400, description = "参数校验失败", body = crate::api::ApiError)
    )
)]
async fn create_incident(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateIncidentRequest>,
) -> impl IntoResponse {
    let priority = IncidentPriority::parse_lenient(&req.priority);
    match state
        .service
        .create_incident(&req.title, &req.description, priority, &req.reporter_id)
        .await
    {
        Ok((incident, sla)) => {
            let now = state.service.now();
            success_response(
                StatusCode::CREATED,
                &trace_id,
                IncidentDetailResponse {
                    incident: incident.into(),
                    sla: Some(SlaResponse::from_sla(&sla, now)),
                },
            )
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 分页查询事件列表（不含已软删除）。
/// 默认排序：`created_at` 倒序；默认分页：`limit=20&offset=0`。
#[utoipa::path(
    get,
    path = "/v1/incidents",
    tag = "Incidents",
    params(IncidentListParams, PaginationParams),
    responses(
        (status = 200, description = "事件分页列表", body = Vec<IncidentResponse>),
        (status = 400, description = "过滤参数非法", body = crate::api::ApiError)
    )
)]
async fn list_incidents(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Query(params): Query<IncidentListParams>,
    Query(pagination): Query<PaginationParams>,
) -> impl IntoResponse {
    let filter = match params.to_filter() {
        Ok(f) => f,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
        }
    };
    let limit = pagination.limit();
    let offset = pagination.offset();

    match state.service.list_incidents(&filter, limit, offset).await {
        Ok((rows, total)) => {
            let items: Vec<IncidentResponse> = rows.into_iter().map(Into::into).collect();
            success_paginated_response(StatusCode::OK, &trace_id, items, total, limit, offset)
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 获取事件详情（含 SLA）。
#[utoipa::path(
    get,
    path = "/v1/incidents/{id}",
    tag = "Incidents",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "事件详情", body = IncidentDetailResponse),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn get_incident(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_incident(&id).await {
        Ok((incident, sla)) => {
            let now = state.service.now();
            success_response(
                StatusCode::OK,
                &trace_id,
                IncidentDetailResponse {
                    incident: incident.into(),
                    sla: sla.map(|s| SlaResponse::from_sla(&s, now)),
                },
            )
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 编辑事件的标题 / 描述 / 优先级。
#[utoipa::path(
    patch,
    path = "/v1/incidents/{id}",
    tag = "Incidents",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    request_body = UpdateIncidentRequest,
    responses(
        (status = 200, description = "更新后的事件", body = IncidentResponse),
        (status = 400, description = "参数校验失败", body = crate::api::ApiError),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn update_incident(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<UpdateIncidentRequest>,
) -> impl IntoResponse {
    let priority = req.priority.as_deref().map(IncidentPriority::parse_lenient);
    match state
        .service
        .update_incident(&id, req.title, req.description, priority)
        .await
    {
        Ok(incident) => {
            success_response::<IncidentResponse>(StatusCode::OK, &trace_id, incident.into())
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 软删除事件。行保留到保留期满，由后台任务级联清除。
#[utoipa::path(
    delete,
    path = "/v1/incidents/{id}",
    tag = "Incidents",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "事件已删除"),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn delete_incident(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.delete_incident(&id).await {
        Ok(()) => success_empty_response(StatusCode::OK, &trace_id, "Incident deleted"),
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 指派处理人。open 状态的事件随之进入 in_progress。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/assign",
    tag = "Incidents",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    request_body = AssignIncidentRequest,
    responses(
        (status = 200, description = "更新后的事件", body = IncidentResponse),
        (status = 400, description = "处理人不存在", body = crate::api::ApiError),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn assign_incident(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<AssignIncidentRequest>,
) -> impl IntoResponse {
    match state.service.assign_incident(&id, &req.assignee_id).await {
        Ok(incident) => {
            success_response::<IncidentResponse>(StatusCode::OK, &trace_id, incident.into())
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 写入事件状态。首次进入 resolved 时联动 SLA 判定并通知 reporter。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/status",
    tag = "Incidents",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    request_body = SetStatusRequest,
    responses(
        (status = 200, description = "更新后的事件", body = IncidentResponse),
        (status = 400, description = "未知状态值", body = crate::api::ApiError),
        (status = 404, description = "事件不存在", body = crate::api::ApiError),
        (status = 409, description = "并发冲突，可重试", body = crate::api::ApiError)
    )
)]
async fn set_incident_status(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<SetStatusRequest>,
) -> impl IntoResponse {
    let status = match req.status.parse::<IncidentStatus>() {
        Ok(s) => s,
        Err(msg) => {
            return error_response(StatusCode::BAD_REQUEST, &trace_id, "bad_request", &msg)
        }
    };
    match state.service.set_status(&id, status).await {
        Ok(incident) => {
            success_response::<IncidentResponse>(StatusCode::OK, &trace_id, incident.into())
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 事件统计汇总（存活行的总数、各状态、各优先级计数）。
#[utoipa::path(
    get,
    path = "/v1/incidents/stats/summary",
    tag = "Incidents",
    responses(
        (status = 200, description = "统计汇总", body = StatsResponse)
    )
)]
async fn incident_stats(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.service.incident_stats().await {
        Ok(stats) => {
            success_response::<StatsResponse>(StatusCode::OK, &trace_id, stats.into())
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

pub fn incident_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(list_incidents, create_incident))
        .routes(routes!(get_incident, update_incident, delete_incident))
        .routes(routes!(assign_incident))
        .routes(routes!(set_incident_status))
        .routes(routes!(incident_stats))
}

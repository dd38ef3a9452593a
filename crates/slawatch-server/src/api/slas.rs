use crate::api::{service_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use chrono::{DateTime, Utc};
use serde::Serialize;
use slawatch_common::types::BreachKind;
use slawatch_sla::sla::Sla;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// SLA 档案
#[derive(Serialize, ToSchema)]
pub struct SlaResponse {
    /// SLA 唯一标识
    pub id: String,
    /// 所属事件 ID
    pub incident_id: String,
    /// 状态（active / paused / breached / met）
    pub status: String,
    /// 响应 deadline（建档即定，不可变）
    pub response_deadline: DateTime<Utc>,
    /// 名义解决 deadline（建档即定，不可变）
    pub resolution_deadline: DateTime<Utc>,
    /// 折算暂停时长后的有效解决 deadline
    pub effective_resolution_deadline: DateTime<Utc>,
    /// 首次响应时间
    pub response_at: Option<DateTime<Utc>>,
    /// 当前暂停段的起点
    pub paused_at: Option<DateTime<Utc>>,
    /// 已累计的暂停时长（秒）
    pub paused_duration_secs: i64,
    /// 违约通知时间（至多一次）
    pub breach_notified_at: Option<DateTime<Utc>>,
    /// 距响应 deadline 的剩余分钟数，超时为负
    pub response_remaining_minutes: i64,
    /// 距有效解决 deadline 的剩余分钟数，超时为负
    pub resolution_remaining_minutes: i64,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl SlaResponse {
    pub fn from_sla(sla: &Sla, now: DateTime<Utc>) -> Self {
        Self {
            id: sla.id.clone(),
            incident_id: sla.incident_id.clone(),
            status: sla.status.to_string(),
            response_deadline: sla.response_deadline,
            resolution_deadline: sla.resolution_deadline,
            effective_resolution_deadline: sla.effective_resolution_deadline(),
            response_at: sla.response_at,
            paused_at: sla.paused_at,
            paused_duration_secs: sla.paused_duration_secs,
            breach_notified_at: sla.breach_notified_at,
            response_remaining_minutes: sla.time_remaining(now, BreachKind::Response).num_minutes(),
            resolution_remaining_minutes: sla
                .time_remaining(now, BreachKind::Resolution)
                .num_minutes(),
            created_at: sla.created_at,
            updated_at: sla.updated_at,
        }
    }
}

/// 获取事件的 SLA 档案。
#[utoipa::path(
    get,
    path = "/v1/incidents/{id}/sla",
    tag = "SLA",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "SLA 档案", body = SlaResponse),
        (status = 404, description = "事件或 SLA 不存在", body = crate::api::ApiError)
    )
)]
async fn get_sla(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.get_sla(&id).await {
        Ok(sla) => {
            let now = state.service.now();
            success_response(StatusCode::OK, &trace_id, SlaResponse::from_sla(&sla, now))
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 记录首次响应。幂等：已有响应时间时保持不变。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/sla/response",
    tag = "SLA",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "更新后的 SLA", body = SlaResponse),
        (status = 404, description = "事件或 SLA 不存在", body = crate::api::ApiError),
        (status = 409, description = "状态不允许或并发冲突", body = crate::api::ApiError)
    )
)]
async fn record_response(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.record_response(&id).await {
        Ok(sla) => {
            let now = state.service.now();
            success_response(StatusCode::OK, &trace_id, SlaResponse::from_sla(&sla, now))
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 暂停 SLA 计时（仅 active 状态允许）。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/sla/pause",
    tag = "SLA",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "更新后的 SLA", body = SlaResponse),
        (status = 404, description = "事件或 SLA 不存在", body = crate::api::ApiError),
        (status = 409, description = "状态不允许或并发冲突", body = crate::api::ApiError)
    )
)]
async fn pause_sla(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.pause_sla(&id).await {
        Ok(sla) => {
            let now = state.service.now();
            success_response(StatusCode::OK, &trace_id, SlaResponse::from_sla(&sla, now))
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 恢复 SLA 计时，暂停时长折入 pause credit（仅 paused 状态允许）。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/sla/resume",
    tag = "SLA",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "更新后的 SLA", body = SlaResponse),
        (status = 404, description = "事件或 SLA 不存在", body = crate::api::ApiError),
        (status = 409, description = "状态不允许或并发冲突", body = crate::api::ApiError)
    )
)]
async fn resume_sla(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.resume_sla(&id).await {
        Ok(sla) => {
            let now = state.service.now();
            success_response(StatusCode::OK, &trace_id, SlaResponse::from_sla(&sla, now))
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

pub fn sla_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(get_sla))
        .routes(routes!(record_response))
        .routes(routes!(pause_sla))
        .routes(routes!(resume_sla))
}

use crate::api::{service_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::User;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 用户信息
#[derive(Serialize, ToSchema)]
pub struct UserResponse {
    /// 用户唯一标识
    pub id: String,
    /// 邮箱（通知投递地址，全局唯一）
    pub email: String,
    /// 用户名
    pub username: String,
    /// 显示名
    pub full_name: Option<String>,
    /// 是否启用
    pub active: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            username: u.username,
            full_name: u.full_name,
            active: u.active,
            created_at: u.created_at,
            updated_at: u.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateUserRequest {
    email: String,
    username: String,
    #[serde(default)]
    full_name: Option<String>,
}

/// 创建用户（报告人 / 处理人），邮箱全局唯一。
#[utoipa::path(
    post,
    path = "/v1/users",
    tag = "Users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "用户已创建", body = UserResponse),
        (status = 400, description = "参数校验失败或邮箱已注册", body = crate::api::ApiError)
    )
)]
async fn create_user(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> impl IntoResponse {
    match state
        .service
        .create_user(&req.email, &req.username, req.full_name)
        .await
    {
        Ok(user) => success_response::<UserResponse>(StatusCode::CREATED, &trace_id, user.into()),
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 按用户名正序列出全部用户。
#[utoipa::path(
    get,
    path = "/v1/users",
    tag = "Users",
    responses(
        (status = 200, description = "用户列表", body = Vec<UserResponse>)
    )
)]
async fn list_users(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    match state.service.list_users().await {
        Ok(rows) => {
            let items: Vec<UserResponse> = rows.into_iter().map(Into::into).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

pub fn user_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(list_users, create_user))
}

use crate::api::{service_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::Comment;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 事件备注
#[derive(Serialize, ToSchema)]
pub struct CommentResponse {
    /// 备注唯一标识
    pub id: String,
    /// 所属事件 ID
    pub incident_id: String,
    /// 作者用户 ID
    pub author_id: String,
    /// 内容
    pub content: String,
    /// 是否内部备注（true 时不对报告人展示）
    pub is_internal: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(c: Comment) -> Self {
        Self {
            id: c.id,
            incident_id: c.incident_id,
            author_id: c.author_id,
            content: c.content,
            is_internal: c.is_internal,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct CreateCommentRequest {
    author_id: String,
    content: String,
    #[serde(default)]
    is_internal: bool,
}

/// 给事件追加备注。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/comments",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "备注已创建", body = CommentResponse),
        (status = 400, description = "参数校验失败", body = crate::api::ApiError),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn create_comment(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<CreateCommentRequest>,
) -> impl IntoResponse {
    match state
        .service
        .add_comment(&id, &req.author_id, &req.content, req.is_internal)
        .await
    {
        Ok(comment) => {
            success_response::<CommentResponse>(StatusCode::CREATED, &trace_id, comment.into())
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 按时间正序列出事件的全部备注。
#[utoipa::path(
    get,
    path = "/v1/incidents/{id}/comments",
    tag = "Comments",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "备注列表", body = Vec<CommentResponse>),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn list_comments(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.list_comments(&id).await {
        Ok(rows) => {
            let items: Vec<CommentResponse> = rows.into_iter().map(Into::into).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

pub fn comment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(list_comments, create_comment))
}

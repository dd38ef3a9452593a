use crate::api::{service_error_response, success_response};
use crate::logging::TraceId;
use crate::state::AppState;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slawatch_common::types::Attachment;
use utoipa::ToSchema;
use utoipa_axum::{router::OpenApiRouter, routes};

/// 附件元数据
#[derive(Serialize, ToSchema)]
pub struct AttachmentResponse {
    /// 附件唯一标识
    pub id: String,
    /// 所属事件 ID
    pub incident_id: String,
    /// 原始文件名
    pub filename: String,
    /// 数据目录下的落盘路径
    pub file_path: String,
    /// 文件大小（字节）
    pub file_size: i64,
    /// MIME 类型
    pub content_type: Option<String>,
    /// 上传者用户 ID
    pub uploaded_by: String,
    /// 创建时间
    pub created_at: DateTime<Utc>,
}

impl From<Attachment> for AttachmentResponse {
    fn from(a: Attachment) -> Self {
        Self {
            id: a.id,
            incident_id: a.incident_id,
            filename: a.filename,
            file_path: a.file_path,
            file_size: a.file_size,
            content_type: a.content_type,
            uploaded_by: a.uploaded_by,
            created_at: a.created_at,
        }
    }
}

#[derive(Deserialize, ToSchema)]
struct RegisterAttachmentRequest {
    filename: String,
    /// 文件大小（字节）
    file_size: i64,
    #[serde(default)]
    content_type: Option<String>,
    uploaded_by: String,
}

/// 登记附件元数据（文件本体另行上传到返回的 file_path）。
#[utoipa::path(
    post,
    path = "/v1/incidents/{id}/attachments",
    tag = "Attachments",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    request_body = RegisterAttachmentRequest,
    responses(
        (status = 201, description = "附件已登记", body = AttachmentResponse),
        (status = 400, description = "参数校验失败", body = crate::api::ApiError),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn register_attachment(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RegisterAttachmentRequest>,
) -> impl IntoResponse {
    match state
        .service
        .register_attachment(
            &id,
            &req.filename,
            req.file_size,
            req.content_type,
            &req.uploaded_by,
        )
        .await
    {
        Ok(attachment) => success_response::<AttachmentResponse>(
            StatusCode::CREATED,
            &trace_id,
            attachment.into(),
        ),
        Err(e) => service_error_response(&trace_id, &e),
    }
}

/// 按时间正序列出事件的全部附件。
#[utoipa::path(
    get,
    path = "/v1/incidents/{id}/attachments",
    tag = "Attachments",
    params(
        ("id" = String, Path, description = "事件 ID")
    ),
    responses(
        (status = 200, description = "附件列表", body = Vec<AttachmentResponse>),
        (status = 404, description = "事件不存在", body = crate::api::ApiError)
    )
)]
async fn list_attachments(
    Extension(trace_id): Extension<TraceId>,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.service.list_attachments(&id).await {
        Ok(rows) => {
            let items: Vec<AttachmentResponse> = rows.into_iter().map(Into::into).collect();
            success_response(StatusCode::OK, &trace_id, items)
        }
        Err(e) => service_error_response(&trace_id, &e),
    }
}

pub fn attachment_routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(list_attachments, register_attachment))
}

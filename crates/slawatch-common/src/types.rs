use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Incident priority, ordered from lowest to highest urgency.
///
/// # Examples
///
/// ```
/// use slawatch_common::types::IncidentPriority;
///
/// let p: IncidentPriority = "critical".parse().unwrap();
/// assert_eq!(p, IncidentPriority::Critical);
/// assert_eq!(p.to_string(), "critical");
/// assert!(IncidentPriority::Critical > IncidentPriority::Low);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IncidentPriority {
    Low,
    Medium,
    High,
    Critical,
}

impl IncidentPriority {
    /// Lenient parse for values read back from storage or foreign input.
    /// Unknown strings degrade to `Medium`, mirroring the policy table's
    /// default bucket, so a stored row can never fail to load.
    pub fn parse_lenient(s: &str) -> Self {
        s.parse().unwrap_or(IncidentPriority::Medium)
    }
}

impl std::fmt::Display for IncidentPriority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentPriority::Low => write!(f, "low"),
            IncidentPriority::Medium => write!(f, "medium"),
            IncidentPriority::High => write!(f, "high"),
            IncidentPriority::Critical => write!(f, "critical"),
        }
    }
}

impl std::str::FromStr for IncidentPriority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "low" => Ok(IncidentPriority::Low),
            "medium" => Ok(IncidentPriority::Medium),
            "high" => Ok(IncidentPriority::High),
            "critical" => Ok(IncidentPriority::Critical),
            _ => Err(format!("unknown priority: {s}")),
        }
    }
}

/// Incident lifecycle status.
///
/// Any status write is accepted from any status; only the first entry
/// into `Resolved`/`Closed` stamps the corresponding timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IncidentStatus::Open => write!(f, "open"),
            IncidentStatus::InProgress => write!(f, "in_progress"),
            IncidentStatus::Resolved => write!(f, "resolved"),
            IncidentStatus::Closed => write!(f, "closed"),
        }
    }
}

impl std::str::FromStr for IncidentStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(IncidentStatus::Open),
            "in_progress" => Ok(IncidentStatus::InProgress),
            "resolved" => Ok(IncidentStatus::Resolved),
            "closed" => Ok(IncidentStatus::Closed),
            _ => Err(format!("unknown incident status: {s}")),
        }
    }
}

/// SLA record status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlaStatus {
    Active,
    Paused,
    Breached,
    Met,
}

impl std::fmt::Display for SlaStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SlaStatus::Active => write!(f, "active"),
            SlaStatus::Paused => write!(f, "paused"),
            SlaStatus::Breached => write!(f, "breached"),
            SlaStatus::Met => write!(f, "met"),
        }
    }
}

impl std::str::FromStr for SlaStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "active" => Ok(SlaStatus::Active),
            "paused" => Ok(SlaStatus::Paused),
            "breached" => Ok(SlaStatus::Breached),
            "met" => Ok(SlaStatus::Met),
            _ => Err(format!("unknown sla status: {s}")),
        }
    }
}

/// Which SLA deadline was missed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreachKind {
    Response,
    Resolution,
}

impl std::fmt::Display for BreachKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreachKind::Response => write!(f, "response"),
            BreachKind::Resolution => write!(f, "resolution"),
        }
    }
}

/// Notification trigger classes, one per intent payload variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Created,
    Breach,
    ApproachingDeadline,
    Resolved,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotificationKind::Created => write!(f, "created"),
            NotificationKind::Breach => write!(f, "breach"),
            NotificationKind::ApproachingDeadline => write!(f, "approaching_deadline"),
            NotificationKind::Resolved => write!(f, "resolved"),
        }
    }
}

/// 用户记录（users 表，报告人 / 处理人 / 通知收件人）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// 数据库 ID
    pub id: String,
    /// 邮箱（唯一，通知收件地址）
    pub email: String,
    /// 用户名（唯一）
    pub username: String,
    /// 显示名称
    pub full_name: Option<String>,
    /// 是否启用
    pub active: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 工作备注（comments 表，挂在事件下）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    /// 数据库 ID
    pub id: String,
    /// 所属事件 ID
    pub incident_id: String,
    /// 作者用户 ID
    pub author_id: String,
    /// 备注内容
    pub content: String,
    /// 是否仅内部可见
    pub is_internal: bool,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
}

/// 附件元数据（attachments 表，文件本体不在本系统内传输）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    /// 数据库 ID
    pub id: String,
    /// 所属事件 ID
    pub incident_id: String,
    /// 原始文件名
    pub filename: String,
    /// 存储路径
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

/// Kind-specific payload carried by a [`NotificationIntent`].
///
/// Durations travel as whole minutes so the intent stays serializable
/// for webhook bodies without a custom Duration codec.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationPayload {
    Created {
        response_deadline: DateTime<Utc>,
        resolution_deadline: DateTime<Utc>,
    },
    Breach {
        breach: BreachKind,
        deadline: DateTime<Utc>,
        overdue_minutes: i64,
    },
    ApproachingDeadline {
        resolution_deadline: DateTime<Utc>,
        minutes_remaining: i64,
    },
    Resolved {
        resolved_at: DateTime<Utc>,
        sla_met: bool,
        resolution_minutes: i64,
    },
}

/// A single notification request produced by the service layer or the
/// breach scanner. Ephemeral: never persisted, consumed by the dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationIntent {
    pub incident_id: String,
    pub incident_title: String,
    pub priority: IncidentPriority,
    pub status: IncidentStatus,
    /// Recipient email address.
    pub recipient: String,
    pub payload: NotificationPayload,
}

impl NotificationIntent {
    pub fn kind(&self) -> NotificationKind {
        match self.payload {
            NotificationPayload::Created { .. } => NotificationKind::Created,
            NotificationPayload::Breach { .. } => NotificationKind::Breach,
            NotificationPayload::ApproachingDeadline { .. } => {
                NotificationKind::ApproachingDeadline
            }
            NotificationPayload::Resolved { .. } => NotificationKind::Resolved,
        }
    }
}

/// Format a duration for human-facing notification text.
///
/// Negative durations render as "overdue" rather than a signed number.
///
/// # Examples
///
/// ```
/// use chrono::Duration;
/// use slawatch_common::types::format_duration;
///
/// assert_eq!(format_duration(Duration::minutes(150)), "2h 30m");
/// assert_eq!(format_duration(Duration::hours(76)), "3d 4h");
/// assert_eq!(format_duration(Duration::minutes(-5)), "overdue");
/// ```
pub fn format_duration(d: Duration) -> String {
    let total_minutes = d.num_minutes();
    if total_minutes < 0 {
        return "overdue".to_string();
    }
    let days = total_minutes / (60 * 24);
    let hours = (total_minutes % (60 * 24)) / 60;
    let minutes = total_minutes % 60;
    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

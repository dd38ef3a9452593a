use serde::{Deserialize, Serialize};
use slawatch_sla::policy::{SlaDeadlines, SlaPolicy};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    /// 软删除事件的保留天数，到期后由后台任务级联硬删
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// CORS 允许的 origins 列表，为空时允许所有来源（开发模式）
    #[serde(default)]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub sla: SlaConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_port: default_http_port(),
            data_dir: default_data_dir(),
            retention_days: default_retention_days(),
            cors_allowed_origins: Vec::new(),
            sla: SlaConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Missing config file is not an error: every field has a default,
    /// so a bare `slawatch-server` starts with the built-in settings.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path, "Config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn connection_url(&self) -> String {
        format!("sqlite://{}/slawatch.db?mode=rwc", self.data_dir)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlaConfig {
    #[serde(default = "default_sla_scan_enabled")]
    pub enabled: bool,
    /// 违约扫描周期（秒）
    #[serde(default = "default_breach_scan_secs")]
    pub breach_scan_secs: u64,
    /// 到期预警扫描周期（秒）
    #[serde(default = "default_warning_scan_secs")]
    pub warning_scan_secs: u64,

    #[serde(default = "default_critical_response_hours")]
    pub critical_response_hours: i64,
    #[serde(default = "default_critical_resolution_hours")]
    pub critical_resolution_hours: i64,
    #[serde(default = "default_high_response_hours")]
    pub high_response_hours: i64,
    #[serde(default = "default_high_resolution_hours")]
    pub high_resolution_hours: i64,
    #[serde(default = "default_medium_response_hours")]
    pub medium_response_hours: i64,
    #[serde(default = "default_medium_resolution_hours")]
    pub medium_resolution_hours: i64,
    #[serde(default = "default_low_response_hours")]
    pub low_response_hours: i64,
    #[serde(default = "default_low_resolution_hours")]
    pub low_resolution_hours: i64,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            enabled: default_sla_scan_enabled(),
            breach_scan_secs: default_breach_scan_secs(),
            warning_scan_secs: default_warning_scan_secs(),
            critical_response_hours: default_critical_response_hours(),
            critical_resolution_hours: default_critical_resolution_hours(),
            high_response_hours: default_high_response_hours(),
            high_resolution_hours: default_high_resolution_hours(),
            medium_response_hours: default_medium_response_hours(),
            medium_resolution_hours: default_medium_resolution_hours(),
            low_response_hours: default_low_response_hours(),
            low_resolution_hours: default_low_resolution_hours(),
        }
    }
}

impl SlaConfig {
    pub fn policy(&self) -> SlaPolicy {
        SlaPolicy {
            critical: SlaDeadlines::new(
                self.critical_response_hours,
                self.critical_resolution_hours,
            ),
            high: SlaDeadlines::new(self.high_response_hours, self.high_resolution_hours),
            medium: SlaDeadlines::new(self.medium_response_hours, self.medium_resolution_hours),
            low: SlaDeadlines::new(self.low_response_hours, self.low_resolution_hours),
        }
    }
}

fn default_sla_scan_enabled() -> bool {
    true
}

fn default_breach_scan_secs() -> u64 {
    300
}

fn default_warning_scan_secs() -> u64 {
    900
}

fn default_critical_response_hours() -> i64 {
    1
}

fn default_critical_resolution_hours() -> i64 {
    4
}

fn default_high_response_hours() -> i64 {
    4
}

fn default_high_resolution_hours() -> i64 {
    24
}

fn default_medium_response_hours() -> i64 {
    8
}

fn default_medium_resolution_hours() -> i64 {
    72
}

fn default_low_response_hours() -> i64 {
    24
}

fn default_low_resolution_hours() -> i64 {
    168
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub email: EmailNotifyConfig,
    #[serde(default)]
    pub webhook: WebhookNotifyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailNotifyConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_username: Option<String>,
    #[serde(default)]
    pub smtp_password: Option<String>,
    /// 发件人地址
    #[serde(default = "default_smtp_from")]
    pub from: String,
}

impl Default for EmailNotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
            smtp_username: None,
            smtp_password: None,
            from: default_smtp_from(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookNotifyConfig {
    #[serde(default)]
    pub enabled: bool,
    /// 每个 URL 是一个独立的投递渠道
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookNotifyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            urls: Vec::new(),
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> String {
    "data".to_string()
}

fn default_retention_days() -> u32 {
    30
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

fn default_smtp_from() -> String {
    "slawatch@localhost".to_string()
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

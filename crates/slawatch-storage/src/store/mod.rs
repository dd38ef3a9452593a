use crate::error::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection};
use std::path::Path;

pub mod attachment;
pub mod comment;
pub mod incident;
pub mod sla;
pub mod user;

// ---- 公开过滤器 / 汇总类型（从各子模块重新导出）----
pub use incident::{IncidentFilter, IncidentStats};
pub use sla::ScanCandidate;

/// 事件管理数据库（slawatch.db）的统一访问层。
///
/// 所有方法均为 `async fn`，底层使用 SeaORM + SQLite。
/// 事件、SLA、用户、备注与附件共用同一个库文件。
pub struct IncidentStore {
    pub(crate) db: DatabaseConnection,
}

impl IncidentStore {
    /// 连接并初始化管理数据库。
    ///
    /// - `db_url`：完整的数据库连接 URL，由调用方（服务器配置）提供。
    ///   SQLite 示例：`sqlite://data/slawatch.db?mode=rwc`
    /// - `data_dir`：本地数据目录，保证在打开数据库前已存在。
    ///
    /// 自动运行 `sea-orm-migration` 迁移，确保 Schema 最新。
    pub async fn new(db_url: &str, data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db = Database::connect(db_url).await?;

        // WAL 模式仅对 SQLite 有效
        if db_url.starts_with("sqlite://") {
            db.execute_unprepared("PRAGMA journal_mode=WAL;").await?;
        }

        Migrator::up(&db, None).await?;

        tracing::info!(db_url = %db_url, "Initialized incident store (SeaORM)");

        Ok(Self { db })
    }

    /// 返回底层数据库连接引用（供子模块使用）。
    pub(crate) fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use slawatch_common::types::Attachment;

use crate::entities::attachment::{self, Column, Entity};
use crate::error::Result;
use crate::store::IncidentStore;

pub(crate) fn to_attachment(m: attachment::Model) -> Attachment {
    Attachment {
        id: m.id,
        incident_id: m.incident_id,
        filename: m.filename,
        file_path: m.file_path,
        file_size: m.file_size,
        content_type: m.content_type,
        uploaded_by: m.uploaded_by,
        created_at: m.created_at,
    }
}

fn to_active(a: &Attachment) -> attachment::ActiveModel {
    attachment::ActiveModel {
        id: Set(a.id.clone()),
        incident_id: Set(a.incident_id.clone()),
        filename: Set(a.filename.clone()),
        file_path: Set(a.file_path.clone()),
        file_size: Set(a.file_size),
        content_type: Set(a.content_type.clone()),
        uploaded_by: Set(a.uploaded_by.clone()),
        created_at: Set(a.created_at),
    }
}

impl IncidentStore {
    /// 登记一条附件元数据。文件本体由上层落盘，这里只存路径。
    pub async fn insert_attachment(&self, a: &Attachment) -> Result<()> {
        Entity::insert(to_active(a)).exec(self.db()).await?;
        Ok(())
    }

    /// 按上传时间正序列出某事件的附件。
    pub async fn list_attachments(&self, incident_id: &str) -> Result<Vec<Attachment>> {
        let models = Entity::find()
            .filter(Column::IncidentId.eq(incident_id))
            .order_by_asc(Column::CreatedAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_attachment).collect())
    }
}

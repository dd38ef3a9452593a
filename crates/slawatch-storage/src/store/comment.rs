use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use slawatch_common::types::Comment;

use crate::entities::comment::{self, Column, Entity};
use crate::error::Result;
use crate::store::IncidentStore;

pub(crate) fn to_comment(m: comment::Model) -> Comment {
    Comment {
        id: m.id,
        incident_id: m.incident_id,
        author_id: m.author_id,
        content: m.content,
        is_internal: m.is_internal,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn to_active(c: &Comment) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(c.id.clone()),
        incident_id: Set(c.incident_id.clone()),
        author_id: Set(c.author_id.clone()),
        content: Set(c.content.clone()),
        is_internal: Set(c.is_internal),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    }
}

impl IncidentStore {
    /// 给事件追加一条评论。
    pub async fn insert_comment(&self, c: &Comment) -> Result<()> {
        Entity::insert(to_active(c)).exec(self.db()).await?;
        Ok(())
    }

    /// 按时间正序列出某事件的全部评论。
    pub async fn list_comments(&self, incident_id: &str) -> Result<Vec<Comment>> {
        let models = Entity::find()
            .filter(Column::IncidentId.eq(incident_id))
            .order_by_asc(Column::CreatedAt)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_comment).collect())
    }
}

use sea_orm::{ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use slawatch_common::types::User;

use crate::entities::user::{self, Column, Entity};
use crate::error::Result;
use crate::store::IncidentStore;

pub(crate) fn to_user(m: user::Model) -> User {
    User {
        id: m.id,
        email: m.email,
        username: m.username,
        full_name: m.full_name,
        active: m.active,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn to_active(u: &User) -> user::ActiveModel {
    user::ActiveModel {
        id: Set(u.id.clone()),
        email: Set(u.email.clone()),
        username: Set(u.username.clone()),
        full_name: Set(u.full_name.clone()),
        active: Set(u.active),
        created_at: Set(u.created_at),
        updated_at: Set(u.updated_at),
    }
}

impl IncidentStore {
    /// 新增用户。email 与 username 的唯一性由表约束保证，
    /// 冲突时以 [`StorageError::Database`] 形式返回。
    ///
    /// [`StorageError::Database`]: crate::error::StorageError::Database
    pub async fn insert_user(&self, u: &User) -> Result<()> {
        Entity::insert(to_active(u)).exec(self.db()).await?;
        Ok(())
    }

    /// 按 ID 取用户。
    pub async fn get_user(&self, id: &str) -> Result<Option<User>> {
        let model = Entity::find_by_id(id).one(self.db()).await?;
        Ok(model.map(to_user))
    }

    /// 按邮箱取用户（启动播种时用来判断默认账号是否已存在）。
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let model = Entity::find()
            .filter(Column::Email.eq(email))
            .one(self.db())
            .await?;
        Ok(model.map(to_user))
    }

    /// 全量用户列表，按用户名排序。
    pub async fn list_users(&self) -> Result<Vec<User>> {
        let models = Entity::find()
            .order_by_asc(Column::Username)
            .all(self.db())
            .await?;
        Ok(models.into_iter().map(to_user).collect())
    }

    /// 用户总数。
    pub async fn count_users(&self) -> Result<u64> {
        Ok(Entity::find().count(self.db()).await?)
    }
}

use super::DBPool;
use crate::{
    error::{Error, Result},
    model::{Tag, TagPayload},
};

/// 标签的持久化接口
pub trait TagRepository: Clone + Send + Sync + 'static {
    /// 新建标签，名称在未删除的标签中唯一
    fn create(&self, tag: TagPayload) -> impl Future<Output = Result<Tag>> + Send;

    /// 仅更新名称
    fn update(&self, id: i64, tag: TagPayload) -> impl Future<Output = Result<Tag>> + Send;

    /// 软删除标签并解除它与新闻的关联，新闻本身不受影响
    fn delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    /// 全部标签，按 id 倒序
    fn list(&self) -> impl Future<Output = Result<Vec<Tag>>> + Send;
}

/// 将唯一约束冲突转为 [`Error::InvalidArgument`]
fn name_conflict(name: &str, e: sqlx::Error) -> Error {
    let unique = e
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation());

    if unique {
        Error::InvalidArgument(format!("tag `{name}` already exists"))
    } else {
        Error::Sqlx(e)
    }
}

impl TagRepository for DBPool {
    async fn create(&self, tag: TagPayload) -> Result<Tag> {
        sqlx::query_as::<_, Tag>("INSERT INTO tags (name) VALUES ($1) RETURNING *")
            .bind(&tag.name)
            .fetch_one(self)
            .await
            .map_err(|e| name_conflict(&tag.name, e))
    }

    async fn update(&self, id: i64, tag: TagPayload) -> Result<Tag> {
        sqlx::query_as::<_, Tag>(
            r#"
            UPDATE tags
            SET name = $2, updated_at = now()
            WHERE id = $1
            AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&tag.name)
        .fetch_optional(self)
        .await
        .map_err(|e| name_conflict(&tag.name, e))?
        .ok_or(Error::NotFound)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tx = self.begin().await?;

        let deleted = sqlx::query(
            "UPDATE tags SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if deleted == 0 {
            return Err(Error::NotFound);
        }

        sqlx::query("DELETE FROM news_tag WHERE tag_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        Ok(sqlx::query_as::<_, Tag>(
            "SELECT * FROM tags WHERE deleted_at IS NULL ORDER BY id DESC",
        )
        .fetch_all(self)
        .await?)
    }
}

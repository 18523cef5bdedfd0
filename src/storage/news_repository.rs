use std::collections::HashMap;

use sqlx::{PgConnection, QueryBuilder};

use super::DBPool;
use crate::{
    error::{Error, Result},
    model::{News, NewsFilter, NewsPayload, Tag, TagTarget},
};

/// 新闻的持久化接口
///
/// 所有读取都会忽略已软删除的记录，返回的 [`News`] 均已附带关联标签。
pub trait NewsRepository: Clone + Send + Sync + 'static {
    /// 新建新闻并关联标签
    ///
    /// 只带名称的标签引用会复用同名标签或新建标签。
    /// 引用了不存在的标签 id 时返回 [`Error::InvalidArgument`]，不会写入任何数据。
    fn create(&self, news: NewsPayload) -> impl Future<Output = Result<News>> + Send;

    /// 整体替换新闻字段与标签集合，`created_at` 保持不变
    fn update(&self, id: i64, news: NewsPayload) -> impl Future<Output = Result<News>> + Send;

    /// 软删除
    fn delete(&self, id: i64) -> impl Future<Output = Result<()>> + Send;

    /// 按 id 查询，不存在时返回 [`Error::NotFound`]
    fn get_by_id(&self, id: i64) -> impl Future<Output = Result<News>> + Send;

    /// 按 [`NewsFilter`] 过滤，结果按 id 倒序
    fn list(&self, filter: NewsFilter) -> impl Future<Output = Result<Vec<News>>> + Send;
}

/// 查询标签时附带所属新闻 id
#[derive(sqlx::FromRow)]
struct NewsTagRow {
    news_id: i64,
    #[sqlx(flatten)]
    tag: Tag,
}

/// 批量加载新闻的标签，按标签 id 升序
async fn load_tags(conn: &mut PgConnection, news_ids: &[i64]) -> Result<HashMap<i64, Vec<Tag>>> {
    let rows = sqlx::query_as::<_, NewsTagRow>(
        r#"
        SELECT nt.news_id, t.id, t.created_at, t.updated_at, t.deleted_at, t.name
        FROM news_tag nt
        INNER JOIN tags t ON t.id = nt.tag_id
        WHERE nt.news_id = ANY($1)
        AND t.deleted_at IS NULL
        ORDER BY t.id
        "#,
    )
    .bind(news_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut tags: HashMap<i64, Vec<Tag>> = HashMap::new();
    for row in rows {
        tags.entry(row.news_id).or_default().push(row.tag);
    }
    Ok(tags)
}

async fn attach_tags(conn: &mut PgConnection, mut news: Vec<News>) -> Result<Vec<News>> {
    if news.is_empty() {
        return Ok(news);
    }

    let ids: Vec<i64> = news.iter().map(|n| n.id).collect();
    let mut tags = load_tags(conn, &ids).await?;
    for n in &mut news {
        n.tags = tags.remove(&n.id).unwrap_or_default();
    }
    Ok(news)
}

async fn attach_one(conn: &mut PgConnection, news: News) -> Result<News> {
    attach_tags(conn, vec![news])
        .await?
        .pop()
        .ok_or(Error::NotFound)
}

/// 将标签引用解析为标签 id
///
/// `ID` 必须指向未删除的标签；按名称引用时复用同名的未删除标签，不存在则新建。
async fn resolve_tags(conn: &mut PgConnection, targets: &[TagTarget]) -> Result<Vec<i64>> {
    let ids: Vec<i64> = targets.iter().filter_map(TagTarget::id).collect();
    if !ids.is_empty() {
        let live: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM tags WHERE id = ANY($1) AND deleted_at IS NULL")
                .bind(&ids)
                .fetch_all(&mut *conn)
                .await?;

        if let Some(missing) = ids.iter().find(|id| !live.contains(id)) {
            return Err(Error::InvalidArgument(format!("tag {missing} not found")));
        }
    }

    let mut resolved = Vec::with_capacity(targets.len());
    for target in targets {
        let id = match target {
            TagTarget::Id(id) => *id,
            TagTarget::Name(name) => tag_id_by_name(conn, name).await?,
        };
        if !resolved.contains(&id) {
            resolved.push(id);
        }
    }
    Ok(resolved)
}

async fn tag_id_by_name(conn: &mut PgConnection, name: &str) -> Result<i64> {
    let inserted: Option<i64> = sqlx::query_scalar(
        r#"
        INSERT INTO tags (name) VALUES ($1)
        ON CONFLICT (name) WHERE deleted_at IS NULL DO NOTHING
        RETURNING id
        "#,
    )
    .bind(name)
    .fetch_optional(&mut *conn)
    .await?;

    match inserted {
        Some(id) => Ok(id),
        None => Ok(
            sqlx::query_scalar("SELECT id FROM tags WHERE name = $1 AND deleted_at IS NULL")
                .bind(name)
                .fetch_one(&mut *conn)
                .await?,
        ),
    }
}

/// 建立新闻与标签的关联
async fn link_tags(conn: &mut PgConnection, news_id: i64, targets: &[TagTarget]) -> Result<()> {
    let tag_ids = resolve_tags(conn, targets).await?;
    if tag_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        INSERT INTO news_tag (news_id, tag_id)
        SELECT $1, UNNEST($2::BIGINT[])
        ON CONFLICT DO NOTHING
        "#,
    )
    .bind(news_id)
    .bind(&tag_ids)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

impl NewsRepository for DBPool {
    async fn create(&self, news: NewsPayload) -> Result<News> {
        let targets = news.tag_targets()?;
        let mut tx = self.begin().await?;

        let created = sqlx::query_as::<_, News>(
            r#"
            INSERT INTO news (title, thumbnail, summary, content, topic, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&news.title)
        .bind(&news.thumbnail)
        .bind(&news.summary)
        .bind(&news.content)
        .bind(&news.topic)
        .bind(&news.status)
        .fetch_one(&mut *tx)
        .await?;

        link_tags(&mut *tx, created.id, &targets).await?;
        let created = attach_one(&mut *tx, created).await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update(&self, id: i64, news: NewsPayload) -> Result<News> {
        let targets = news.tag_targets()?;
        let mut tx = self.begin().await?;

        let updated = sqlx::query_as::<_, News>(
            r#"
            UPDATE news
            SET
                title = $2,
                thumbnail = $3,
                summary = $4,
                content = $5,
                topic = $6,
                status = $7,
                updated_at = now()
            WHERE id = $1
            AND deleted_at IS NULL
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&news.title)
        .bind(&news.thumbnail)
        .bind(&news.summary)
        .bind(&news.content)
        .bind(&news.topic)
        .bind(&news.status)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(Error::NotFound)?;

        sqlx::query("DELETE FROM news_tag WHERE news_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        link_tags(&mut *tx, id, &targets).await?;
        let updated = attach_one(&mut *tx, updated).await?;

        tx.commit().await?;
        Ok(updated)
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let deleted = sqlx::query(
            "UPDATE news SET deleted_at = now() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .execute(self)
        .await?
        .rows_affected();

        match deleted {
            0 => Err(Error::NotFound),
            _ => Ok(()),
        }
    }

    async fn get_by_id(&self, id: i64) -> Result<News> {
        let news = sqlx::query_as::<_, News>(
            "SELECT * FROM news WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id)
        .fetch_optional(self)
        .await?
        .ok_or(Error::NotFound)?;

        let mut conn = self.acquire().await?;
        attach_one(&mut conn, news).await
    }

    async fn list(&self, filter: NewsFilter) -> Result<Vec<News>> {
        let tag_id = filter.tag_id()?;

        let mut builder = QueryBuilder::new("SELECT n.* FROM news n");
        if let Some(tag_id) = tag_id {
            builder
                .push(" INNER JOIN news_tag nt ON nt.news_id = n.id AND nt.tag_id = ")
                .push_bind(tag_id);
        }

        builder.push(" WHERE n.deleted_at IS NULL");
        if let Some(topic) = filter.topic {
            builder.push(" AND n.topic = ").push_bind(topic);
        }
        if let Some(status) = filter.status {
            builder.push(" AND n.status = ").push_bind(status);
        }
        builder.push(" ORDER BY n.id DESC");

        let news = builder.build_query_as::<News>().fetch_all(self).await?;

        let mut conn = self.acquire().await?;
        attach_tags(&mut conn, news).await
    }
}

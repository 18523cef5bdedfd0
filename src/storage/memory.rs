use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;

use super::{NewsRepository, TagRepository};
use crate::{
    error::{Error, Result},
    model::{News, NewsFilter, NewsPayload, Tag, TagPayload, TagTarget},
};

/// 内存实现的存储
///
/// 同时实现 [`NewsRepository`] 与 [`TagRepository`]，语义与 PostgreSQL 实现一致，
/// 用于不依赖数据库的测试。克隆后共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    news: BTreeMap<i64, News>,
    tags: BTreeMap<i64, Tag>,
    /// (news_id, tag_id)
    links: BTreeSet<(i64, i64)>,
    news_seq: i64,
    tag_seq: i64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Tables {
    fn live_news(&self, id: i64) -> Result<&News> {
        self.news
            .get(&id)
            .filter(|n| n.deleted_at.is_none())
            .ok_or(Error::NotFound)
    }

    fn live_tag(&self, id: i64) -> Option<&Tag> {
        self.tags.get(&id).filter(|t| t.deleted_at.is_none())
    }

    fn live_tag_named(&self, name: &str) -> Option<&Tag> {
        self.tags
            .values()
            .find(|t| t.deleted_at.is_none() && t.name == name)
    }

    fn check_tags(&self, targets: &[TagTarget]) -> Result<()> {
        let missing = targets
            .iter()
            .filter_map(TagTarget::id)
            .find(|id| self.live_tag(*id).is_none());

        match missing {
            Some(missing) => Err(Error::InvalidArgument(format!("tag {missing} not found"))),
            None => Ok(()),
        }
    }

    fn insert_tag(&mut self, name: String) -> Tag {
        self.tag_seq += 1;
        let now = Utc::now();
        let tag = Tag {
            id: self.tag_seq,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            name,
        };
        self.tags.insert(tag.id, tag.clone());
        tag
    }

    /// 调用前须先通过 [`Tables::check_tags`]，保证失败时不会留下新建的标签
    fn resolve_tags(&mut self, targets: &[TagTarget]) -> Vec<i64> {
        let mut resolved = Vec::with_capacity(targets.len());
        for target in targets {
            let id = match target {
                TagTarget::Id(id) => *id,
                TagTarget::Name(name) => match self.live_tag_named(name) {
                    Some(tag) => tag.id,
                    None => self.insert_tag(name.clone()).id,
                },
            };
            if !resolved.contains(&id) {
                resolved.push(id);
            }
        }
        resolved
    }

    fn check_name(&self, name: &str, except: Option<i64>) -> Result<()> {
        let taken = self
            .live_tag_named(name)
            .is_some_and(|t| Some(t.id) != except);

        if taken {
            Err(Error::InvalidArgument(format!("tag `{name}` already exists")))
        } else {
            Ok(())
        }
    }

    fn relink(&mut self, news_id: i64, tag_ids: &[i64]) {
        self.links.retain(|(n, _)| *n != news_id);
        self.links.extend(tag_ids.iter().map(|t| (news_id, *t)));
    }

    fn with_tags(&self, news: &News) -> News {
        let tags = self
            .links
            .range((news.id, i64::MIN)..=(news.id, i64::MAX))
            .filter_map(|(_, tag_id)| self.live_tag(*tag_id))
            .cloned()
            .collect();

        News {
            tags,
            ..news.clone()
        }
    }

    fn has_tag(&self, news_id: i64, tag_id: Option<i64>) -> bool {
        tag_id.is_none_or(|tag_id| self.links.contains(&(news_id, tag_id)))
    }
}

impl NewsRepository for MemoryStore {
    async fn create(&self, news: NewsPayload) -> Result<News> {
        let targets = news.tag_targets()?;
        let mut tables = self.tables();
        tables.check_tags(&targets)?;
        let tag_ids = tables.resolve_tags(&targets);

        tables.news_seq += 1;
        let id = tables.news_seq;
        let now = Utc::now();
        let created = News {
            id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
            title: news.title,
            thumbnail: news.thumbnail,
            summary: news.summary,
            content: news.content,
            tags: Vec::new(),
            topic: news.topic,
            status: news.status,
        };

        tables.news.insert(id, created);
        tables.relink(id, &tag_ids);
        Ok(tables.with_tags(tables.live_news(id)?))
    }

    async fn update(&self, id: i64, news: NewsPayload) -> Result<News> {
        let targets = news.tag_targets()?;
        let mut tables = self.tables();
        tables.live_news(id)?;
        tables.check_tags(&targets)?;
        let tag_ids = tables.resolve_tags(&targets);

        if let Some(target) = tables.news.get_mut(&id) {
            target.title = news.title;
            target.thumbnail = news.thumbnail;
            target.summary = news.summary;
            target.content = news.content;
            target.topic = news.topic;
            target.status = news.status;
            target.updated_at = Utc::now();
        }

        tables.relink(id, &tag_ids);
        Ok(tables.with_tags(tables.live_news(id)?))
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.tables();
        tables.live_news(id)?;

        if let Some(target) = tables.news.get_mut(&id) {
            target.deleted_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> Result<News> {
        let tables = self.tables();
        Ok(tables.with_tags(tables.live_news(id)?))
    }

    async fn list(&self, filter: NewsFilter) -> Result<Vec<News>> {
        let tag_id = filter.tag_id()?;
        let tables = self.tables();

        let news = tables
            .news
            .values()
            .rev()
            .filter(|n| n.deleted_at.is_none())
            .filter(|n| filter.topic.as_ref().is_none_or(|t| &n.topic == t))
            .filter(|n| filter.status.as_ref().is_none_or(|s| &n.status == s))
            .filter(|n| tables.has_tag(n.id, tag_id))
            .map(|n| tables.with_tags(n))
            .collect();
        Ok(news)
    }
}

impl TagRepository for MemoryStore {
    async fn create(&self, tag: TagPayload) -> Result<Tag> {
        let mut tables = self.tables();
        tables.check_name(&tag.name, None)?;
        Ok(tables.insert_tag(tag.name))
    }

    async fn update(&self, id: i64, tag: TagPayload) -> Result<Tag> {
        let mut tables = self.tables();
        if tables.live_tag(id).is_none() {
            return Err(Error::NotFound);
        }
        tables.check_name(&tag.name, Some(id))?;

        let target = tables.tags.get_mut(&id).ok_or(Error::NotFound)?;
        target.name = tag.name;
        target.updated_at = Utc::now();
        Ok(target.clone())
    }

    async fn delete(&self, id: i64) -> Result<()> {
        let mut tables = self.tables();
        if tables.live_tag(id).is_none() {
            return Err(Error::NotFound);
        }

        if let Some(target) = tables.tags.get_mut(&id) {
            target.deleted_at = Some(Utc::now());
        }
        tables.links.retain(|(_, t)| *t != id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Tag>> {
        Ok(self
            .tables()
            .tags
            .values()
            .rev()
            .filter(|t| t.deleted_at.is_none())
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, topic: &str, status: &str, tags: &[i64]) -> NewsPayload {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "thumbnail": "http://img/1.png",
            "summary": "summary",
            "content": "content",
            "topic": topic,
            "status": status,
            "tags": tags.iter().map(|id| serde_json::json!({"ID": id})).collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    async fn tag(store: &MemoryStore, name: &str) -> Tag {
        TagRepository::create(store, TagPayload { name: name.into() })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_create_attaches_tags() {
        let store = MemoryStore::new();
        let crypto = tag(&store, "crypto").await;

        let news = NewsRepository::create(&store, payload("a", "bitcoin", "draft", &[crypto.id]))
            .await
            .unwrap();

        assert_eq!(news.id, 1);
        assert_eq!(news.tags, vec![crypto]);
    }

    #[tokio::test]
    async fn test_create_with_unknown_tag_writes_nothing() {
        let store = MemoryStore::new();

        let result = NewsRepository::create(&store, payload("a", "bitcoin", "draft", &[42])).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(
            NewsRepository::list(&store, NewsFilter::default())
                .await
                .unwrap()
                .is_empty()
        );
    }

    fn payload_with_names(title: &str, names: &[&str]) -> NewsPayload {
        serde_json::from_value(serde_json::json!({
            "title": title,
            "thumbnail": "http://img/1.png",
            "summary": "summary",
            "content": "content",
            "topic": "bitcoin",
            "tags": names.iter().map(|name| serde_json::json!({"name": name})).collect::<Vec<_>>(),
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn test_create_with_inline_tag_names() {
        let store = MemoryStore::new();
        let crypto = tag(&store, "cryptocurrency").await;

        let news = NewsRepository::create(&store, payload_with_names("a", &["cryptocurrency", "defi"]))
            .await
            .unwrap();

        let names: Vec<&str> = news.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["cryptocurrency", "defi"]);
        assert_eq!(news.tags[0].id, crypto.id);

        let tags = TagRepository::list(&store).await.unwrap();
        assert_eq!(tags.len(), 2);
    }

    #[tokio::test]
    async fn test_update_with_inline_tag_name() {
        let store = MemoryStore::new();
        let news = NewsRepository::create(&store, payload("a", "bitcoin", "draft", &[]))
            .await
            .unwrap();

        let updated = NewsRepository::update(&store, news.id, payload_with_names("b", &["fresh"]))
            .await
            .unwrap();
        assert_eq!(updated.tags.len(), 1);
        assert_eq!(updated.tags[0].name, "fresh");

        let again = NewsRepository::update(&store, news.id, payload_with_names("c", &["fresh"]))
            .await
            .unwrap();
        assert_eq!(again.tags, updated.tags);
        assert_eq!(TagRepository::list(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tag_id_creates_no_named_tag() {
        let store = MemoryStore::new();
        let news: NewsPayload = serde_json::from_value(serde_json::json!({
            "title": "a",
            "thumbnail": "http://img/1.png",
            "summary": "summary",
            "content": "content",
            "topic": "bitcoin",
            "tags": [{"name": "fresh"}, {"ID": 42}],
        }))
        .unwrap();

        let result = NewsRepository::create(&store, news).await;

        assert!(matches!(result, Err(Error::InvalidArgument(_))));
        assert!(TagRepository::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_tags_and_keeps_created_at() {
        let store = MemoryStore::new();
        let a = tag(&store, "a").await;
        let b = tag(&store, "b").await;
        let news = NewsRepository::create(&store, payload("old", "bitcoin", "draft", &[a.id]))
            .await
            .unwrap();

        let updated = NewsRepository::update(
            &store,
            news.id,
            payload("new", "ethereum", "publish", &[b.id]),
        )
        .await
        .unwrap();

        assert_eq!(updated.title, "new");
        assert_eq!(updated.topic, "ethereum");
        assert_eq!(updated.created_at, news.created_at);
        assert_eq!(updated.tags, vec![b]);
    }

    #[tokio::test]
    async fn test_soft_deleted_news_is_gone() {
        let store = MemoryStore::new();
        let news = NewsRepository::create(&store, payload("a", "bitcoin", "draft", &[]))
            .await
            .unwrap();

        NewsRepository::delete(&store, news.id).await.unwrap();

        assert!(matches!(
            NewsRepository::get_by_id(&store, news.id).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            NewsRepository::delete(&store, news.id).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(
            NewsRepository::update(&store, news.id, payload("b", "x", "y", &[])).await,
            Err(Error::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_list_filters_by_tag_membership() {
        let store = MemoryStore::new();
        let t1 = tag(&store, "one").await;
        let t2 = tag(&store, "two").await;

        let first = NewsRepository::create(&store, payload("1", "bitcoin", "draft", &[t1.id]))
            .await
            .unwrap();
        NewsRepository::create(&store, payload("2", "bitcoin", "draft", &[t2.id]))
            .await
            .unwrap();
        let third = NewsRepository::create(&store, payload("3", "bitcoin", "draft", &[t1.id, t2.id]))
            .await
            .unwrap();
        NewsRepository::create(&store, payload("4", "bitcoin", "publish", &[t1.id]))
            .await
            .unwrap();

        let filter = NewsFilter {
            topic: Some("bitcoin".into()),
            status: Some("draft".into()),
            tag: Some(t1.id.to_string()),
        };
        let ids: Vec<i64> = NewsRepository::list(&store, filter)
            .await
            .unwrap()
            .iter()
            .map(|n| n.id)
            .collect();

        assert_eq!(ids, vec![third.id, first.id]);
    }

    #[tokio::test]
    async fn test_list_rejects_non_numeric_tag() {
        let store = MemoryStore::new();
        let filter = NewsFilter {
            tag: Some("abc".into()),
            ..Default::default()
        };

        assert!(matches!(
            NewsRepository::list(&store, filter).await,
            Err(Error::InvalidArgument(_))
        ));
    }

    #[tokio::test]
    async fn test_tag_delete_detaches_but_keeps_news() {
        let store = MemoryStore::new();
        let t = tag(&store, "gone").await;
        let news = NewsRepository::create(&store, payload("a", "bitcoin", "draft", &[t.id]))
            .await
            .unwrap();

        TagRepository::delete(&store, t.id).await.unwrap();

        let news = NewsRepository::get_by_id(&store, news.id).await.unwrap();
        assert!(news.tags.is_empty());
        assert!(TagRepository::list(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_tag_names_unique_among_live_tags() {
        let store = MemoryStore::new();
        let first = tag(&store, "rust").await;

        assert!(matches!(
            TagRepository::create(&store, TagPayload { name: "rust".into() }).await,
            Err(Error::InvalidArgument(_))
        ));

        TagRepository::delete(&store, first.id).await.unwrap();
        let again = tag(&store, "rust").await;
        assert_ne!(again.id, first.id);
    }

    #[tokio::test]
    async fn test_tag_list_is_id_descending() {
        let store = MemoryStore::new();
        tag(&store, "a").await;
        tag(&store, "b").await;
        tag(&store, "c").await;

        let names: Vec<String> = TagRepository::list(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.name)
            .collect();

        assert_eq!(names, vec!["c", "b", "a"]);
    }
}

use crate::{
    error::Result,
    model::{News, NewsFilter, NewsList, NewsPayload, Tag, TagPayload, TagsList},
    storage::{NewsRepository, TagRepository},
};

/// 新闻业务层
///
/// 持有一个 [`NewsRepository`] 实现，除列表包装为 [`NewsList`] 外直接透传。
#[derive(Debug, Clone)]
pub struct NewsService<R> {
    repo: R,
}

impl<R: NewsRepository> NewsService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, news: NewsPayload) -> Result<News> {
        self.repo.create(news).await
    }

    pub async fn update(&self, id: i64, news: NewsPayload) -> Result<News> {
        self.repo.update(id, news).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.repo.delete(id).await
    }

    /// 按条件查询新闻列表
    pub async fn list(&self, filter: NewsFilter) -> Result<NewsList> {
        let data = self.repo.list(filter).await?;
        Ok(NewsList { data })
    }

    pub async fn get_detail(&self, id: i64) -> Result<News> {
        self.repo.get_by_id(id).await
    }
}

/// 标签业务层
#[derive(Debug, Clone)]
pub struct TagService<R> {
    repo: R,
}

impl<R: TagRepository> TagService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub async fn create(&self, tag: TagPayload) -> Result<Tag> {
        self.repo.create(tag).await
    }

    pub async fn update(&self, id: i64, tag: TagPayload) -> Result<Tag> {
        self.repo.update(id, tag).await
    }

    pub async fn delete(&self, id: i64) -> Result<()> {
        self.repo.delete(id).await
    }

    pub async fn list(&self) -> Result<TagsList> {
        let data = self.repo.list().await?;
        Ok(TagsList { data })
    }
}

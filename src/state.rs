use axum::extract::FromRef;

use crate::{
    service::{NewsService, TagService},
    storage::{DBPool, NewsRepository, TagRepository},
};

/// 应用程序上下文
///
/// [`AppState`] 封装了新闻与标签两个业务层，各自持有注入的存储实现。
/// 处理函数通过 [`FromRef`] 只取自己需要的那一个。
#[derive(Debug, Clone)]
pub struct AppState<N, T> {
    news: NewsService<N>,
    tags: TagService<T>,
}

impl<N: NewsRepository, T: TagRepository> AppState<N, T> {
    /// 使用指定的存储实现创建 [`AppState`]
    pub fn new(news_repo: N, tag_repo: T) -> Self {
        Self {
            news: NewsService::new(news_repo),
            tags: TagService::new(tag_repo),
        }
    }
}

impl AppState<DBPool, DBPool> {
    /// 新闻与标签共用同一个连接池
    pub fn from_pool(pool: DBPool) -> Self {
        Self::new(pool.clone(), pool)
    }
}

impl<N: Clone, T> FromRef<AppState<N, T>> for NewsService<N> {
    fn from_ref(state: &AppState<N, T>) -> Self {
        state.news.clone()
    }
}

impl<N, T: Clone> FromRef<AppState<N, T>> for TagService<T> {
    fn from_ref(state: &AppState<N, T>) -> Self {
        state.tags.clone()
    }
}

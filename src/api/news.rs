use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};
use axum_extra::extract::{Query, QueryRejection};

use super::{
    extract::{decode, parse_id},
    response::{Reply, response},
};
use crate::{
    error::{Error, Result},
    model::{News, NewsFilter, NewsList, NewsPayload},
    service::NewsService,
    state::AppState,
    storage::{NewsRepository, TagRepository},
};

/// 配置新闻相关路由。
///
/// 路由包括：
/// - `POST /news/`：新建
/// - `PUT /news/{id}`：更新
/// - `DELETE /news/{id}`：删除
/// - `GET /news/{id}`：详情
/// - `GET /news`：列表，支持 `topic`、`tag`、`status` 过滤
pub fn setup_route<N, T>() -> Router<AppState<N, T>>
where
    N: NewsRepository,
    T: TagRepository,
{
    Router::new()
        .route("/news/", post(create::<N>))
        .route(
            "/news/{id}",
            put(update::<N>).delete(delete::<N>).get(detail::<N>),
        )
        .route("/news", get(list::<N>))
}

async fn create<R: NewsRepository>(
    State(service): State<NewsService<R>>,
    payload: core::result::Result<Json<NewsPayload>, JsonRejection>,
) -> Result<Reply<News>> {
    let news = decode(payload)?;
    let created = service.create(news).await?;
    Ok(response(StatusCode::CREATED, created))
}

async fn update<R: NewsRepository>(
    State(service): State<NewsService<R>>,
    Path(id): Path<String>,
    payload: core::result::Result<Json<NewsPayload>, JsonRejection>,
) -> Result<Reply<News>> {
    let news = decode(payload)?;
    let id = parse_id(&id)?;
    let updated = service.update(id, news).await?;
    Ok(response(StatusCode::OK, updated))
}

async fn delete<R: NewsRepository>(
    State(service): State<NewsService<R>>,
    Path(id): Path<String>,
) -> Result<Reply<()>> {
    service.delete(parse_id(&id)?).await?;
    Ok(response(StatusCode::OK, ()))
}

/// 获取新闻列表。
///
/// 空字符串参数视为未提供。
async fn list<R: NewsRepository>(
    State(service): State<NewsService<R>>,
    query: core::result::Result<Query<NewsFilter>, QueryRejection>,
) -> Result<Reply<NewsList>> {
    let Query(filter) = query.map_err(|e| Error::InvalidArgument(e.to_string()))?;
    let news = service.list(filter.normalized()).await?;
    Ok(response(StatusCode::OK, news))
}

async fn detail<R: NewsRepository>(
    State(service): State<NewsService<R>>,
    Path(id): Path<String>,
) -> Result<Reply<News>> {
    let news = service.get_detail(parse_id(&id)?).await?;
    Ok(response(StatusCode::OK, news))
}

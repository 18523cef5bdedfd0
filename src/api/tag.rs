use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post, put},
};

use super::{
    extract::{decode, parse_id},
    response::{Reply, response},
};
use crate::{
    error::Result,
    model::{Tag, TagPayload, TagsList},
    service::TagService,
    state::AppState,
    storage::{NewsRepository, TagRepository},
};

/// 配置标签相关路由。
///
/// 路由包括：
/// - `POST /tag/`：新建
/// - `PUT /tag/{id}`：改名
/// - `DELETE /tag/{id}`：删除
/// - `GET /tag`：全部标签
pub fn setup_route<N, T>() -> Router<AppState<N, T>>
where
    N: NewsRepository,
    T: TagRepository,
{
    Router::new()
        .route("/tag/", post(create::<T>))
        .route("/tag/{id}", put(update::<T>).delete(delete::<T>))
        .route("/tag", get(list::<T>))
}

async fn create<R: TagRepository>(
    State(service): State<TagService<R>>,
    payload: core::result::Result<Json<TagPayload>, JsonRejection>,
) -> Result<Reply<Tag>> {
    let tag = decode(payload)?;
    let created = service.create(tag).await?;
    Ok(response(StatusCode::CREATED, created))
}

async fn update<R: TagRepository>(
    State(service): State<TagService<R>>,
    Path(id): Path<String>,
    payload: core::result::Result<Json<TagPayload>, JsonRejection>,
) -> Result<Reply<Tag>> {
    let tag = decode(payload)?;
    let id = parse_id(&id)?;
    let updated = service.update(id, tag).await?;
    Ok(response(StatusCode::OK, updated))
}

async fn delete<R: TagRepository>(
    State(service): State<TagService<R>>,
    Path(id): Path<String>,
) -> Result<Reply<()>> {
    service.delete(parse_id(&id)?).await?;
    Ok(response(StatusCode::OK, ()))
}

async fn list<R: TagRepository>(State(service): State<TagService<R>>) -> Result<Reply<TagsList>> {
    let tags = service.list().await?;
    Ok(response(StatusCode::OK, tags))
}

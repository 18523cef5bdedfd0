use std::io;

use axum::{Json, http::StatusCode, response::IntoResponse};

use crate::api::response::ApiResponseError;

pub type Result<T> = core::result::Result<T, Error>;

/// 服务统一错误类型。
///
/// 所有错误在返回给客户端时都统一映射为 `400 Bad Request`，
/// 响应体为 [`ApiResponseError`]。
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// 记录不存在或已被软删除
    #[error("record not found")]
    NotFound,

    /// 路径参数 `id` 不是合法的无符号整数
    #[error("invalid format for id")]
    InvalidId,

    /// 参数不合法，例如非数字的标签过滤条件或不存在的标签
    #[error("{0}")]
    InvalidArgument(String),

    /// 请求体解析失败
    #[error("{0}")]
    Decode(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// 客户端可见的错误状态码
    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        match &self {
            Error::Sqlx(e) => {
                tracing::error!(%e, "sqlx error");
            }
            Error::Io(e) => {
                tracing::error!(%e, "io error");
            }
            _ => (),
        }

        let status = self.status();
        (
            status,
            Json(ApiResponseError {
                error: self.to_string(),
                status: status.as_u16(),
            }),
        )
            .into_response()
    }
}

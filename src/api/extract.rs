use axum::{Json, extract::rejection::JsonRejection};

use crate::error::{Error, Result};

/// 取出请求体，失败时记录日志并转为 [`Error::Decode`]
pub fn decode<T>(payload: core::result::Result<Json<T>, JsonRejection>) -> Result<T> {
    match payload {
        Ok(Json(data)) => Ok(data),
        Err(rejection) => {
            let message = rejection.body_text();
            tracing::warn!(error = %message, "failed to decode request body");
            Err(Error::Decode(message))
        }
    }
}

/// 解析路径中的 id
///
/// 必须是无符号整数且不超过存储层 `BIGINT` 的范围。
pub fn parse_id(raw: &str) -> Result<i64> {
    raw.parse::<u64>()
        .ok()
        .and_then(|id| i64::try_from(id).ok())
        .ok_or(Error::InvalidId)
}

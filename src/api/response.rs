use axum::{Json, http::StatusCode};
use serde::{Deserialize, Serialize};

/// 成功响应的统一包装
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

/// 失败响应的统一包装
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponseError {
    pub error: String,
    pub status: u16,
}

/// 处理函数的成功返回值
pub type Reply<T> = (StatusCode, Json<ApiResponse<T>>);

/// 以指定状态码包装数据
pub fn response<T: Serialize>(status: StatusCode, data: T) -> Reply<T> {
    (
        status,
        Json(ApiResponse {
            status: status.as_u16(),
            data,
        }),
    )
}

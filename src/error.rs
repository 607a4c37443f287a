//! 统一错误类型模块
//!
//! # 设计思路
//!
//! 定义全局统一的 `AppError` 枚举，HTTP 层与启动流程都返回此类型，
//! 替代分散的 `.map_err(|e| e.to_string())`、`expect()` 等不一致模式。
//!
//! # 实现思路
//!
//! - 使用 `thiserror` 派生可读错误消息。
//! - 为 `ImageError`、multipart 错误提供 `From` 转换，无需手动 map。
//! - 实现 `IntoResponse`，统一输出 `{"detail": "..."}` 与对应状态码。

use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::multipart::MultipartRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::image_handler::ImageError;

/// 应用级统一错误类型
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// 图片处理流水线错误（校验 / 解码 / 滤镜 / 编码）
    #[error("{0}")]
    Image(#[from] ImageError),

    /// 请求体不是合法的 multipart
    #[error("Malformed multipart body: {}", .0.body_text())]
    MultipartRejected(#[from] MultipartRejection),

    /// 读取 multipart 字段失败
    #[error("Failed to read upload: {}", .0.body_text())]
    Multipart(#[from] MultipartError),

    /// 配置无效
    #[error("配置错误: {0}")]
    Config(String),

    /// 文件系统 / 网络 I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Image(err) => err.status(),
            Self::MultipartRejected(err) => err.status(),
            Self::Multipart(err) => err.status(),
            Self::Config(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = match &self {
            // 内部细节只写日志，不回传客户端
            Self::Config(_) | Self::Io(_) => {
                log::error!("❌ 内部错误: {}", self);
                "Internal server error.".to_string()
            }
            Self::Image(ImageError::Internal(_) | ImageError::Encode(_)) => {
                log::error!("❌ 内部错误: {}", self);
                "Internal server error.".to_string()
            }
            _ => self.to_string(),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_errors_keep_their_status() {
        let err = AppError::from(ImageError::TooLarge { actual: 11, limit: 10 });
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);

        let err = AppError::from(ImageError::UnsupportedMediaType("application/pdf".into()));
        assert_eq!(err.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn internal_errors_hide_details() {
        let response = AppError::Config("secret path".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

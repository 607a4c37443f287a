//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载处理链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//!
//! `Display` 输出即为 HTTP 响应中的 `detail` 文本，面向前端，因此保持英文。

use axum::http::StatusCode;

/// 图片处理统一错误类型。
///
/// 该类型会在 HTTP 层被上转为 `AppError`，最终以 `{"detail": ...}` 返回前端。
#[derive(Debug, thiserror::Error)]
pub enum ImageError {
    #[error("Unsupported media type: {0}. Allowed: image/png, image/jpeg.")]
    UnsupportedMediaType(String),

    #[error("Empty file.")]
    EmptyFile,

    #[error("File too large: {actual} bytes (max {limit} bytes).")]
    TooLarge { actual: u64, limit: u64 },

    #[error("Invalid image: {0}")]
    InvalidImage(String),

    #[error("Invalid phase: '{0}'. Must be 'arterial' or 'venous'.")]
    InvalidPhase(String),

    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error("Failed to encode result: {0}")]
    Encode(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ImageError {
    /// 稳定的错误码，用于日志检索。
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType(_) => "unsupported_media_type",
            Self::EmptyFile => "empty_file",
            Self::TooLarge { .. } => "too_large",
            Self::InvalidImage(_) => "invalid_image",
            Self::InvalidPhase(_) => "invalid_phase",
            Self::MissingField(_) => "missing_field",
            Self::Encode(_) => "encode_failed",
            Self::Internal(_) => "internal",
        }
    }

    /// 出错所在阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::UnsupportedMediaType(_)
            | Self::EmptyFile
            | Self::TooLarge { .. }
            | Self::MissingField(_) => "validate",
            Self::InvalidImage(_) => "decode",
            Self::InvalidPhase(_) => "phase",
            Self::Encode(_) => "encode",
            Self::Internal(_) => "runtime",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::EmptyFile
            | Self::InvalidImage(_)
            | Self::InvalidPhase(_)
            | Self::MissingField(_) => StatusCode::BAD_REQUEST,
            Self::Encode(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_contract() {
        assert_eq!(ImageError::EmptyFile.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ImageError::InvalidImage("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ImageError::InvalidPhase("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ImageError::TooLarge { actual: 2, limit: 1 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            ImageError::UnsupportedMediaType("application/pdf".into()).status(),
            StatusCode::UNSUPPORTED_MEDIA_TYPE
        );
    }

    #[test]
    fn detail_text_is_human_readable() {
        assert_eq!(ImageError::EmptyFile.to_string(), "Empty file.");
        assert_eq!(
            ImageError::InvalidPhase("contrast".into()).to_string(),
            "Invalid phase: 'contrast'. Must be 'arterial' or 'venous'."
        );
    }
}

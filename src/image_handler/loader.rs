//! # 加载与校验模块
//!
//! ## 设计思路
//!
//! 在“尽可能早”的阶段执行输入校验，目标是尽快失败，减少不必要内存与 CPU 消耗。
//! 校验顺序固定：声明类型 → 空文件 → 体积 → 文件签名。
//!
//! ## 实现思路
//!
//! - 声明类型：归一化后做白名单判断。
//! - 体积：上传阶段按块累加，超过上限立即中止读取（`push_chunk_with_limit`）。
//! - 签名：使用 `infer` 识别 magic bytes，拒绝伪装成图片的内容。

use super::config::normalize_content_type;
use super::source::UploadedImage;
use super::{ImageConfig, ImageError, ImageHandler};

const BUFFER_INITIAL_CAPACITY: usize = 64 * 1024;

impl ImageHandler {
    /// 执行解码前的全部校验。
    pub(super) fn validate_upload(
        upload: &UploadedImage,
        config: &ImageConfig,
    ) -> Result<(), ImageError> {
        Self::validate_declared_type(upload.content_type.as_deref(), config)?;

        if upload.bytes.is_empty() {
            return Err(ImageError::EmptyFile);
        }

        Self::validate_size(upload.bytes.len() as u64, config)?;
        Self::validate_image_signature(&upload.bytes)
    }

    /// 校验 multipart 中声明的类型，缺失视为不支持。
    pub(crate) fn validate_declared_type(
        declared: Option<&str>,
        config: &ImageConfig,
    ) -> Result<(), ImageError> {
        match declared {
            Some(content_type) if config.is_allowed_content_type(content_type) => Ok(()),
            Some(content_type) => Err(ImageError::UnsupportedMediaType(normalize_content_type(
                content_type,
            ))),
            None => Err(ImageError::UnsupportedMediaType("<missing>".to_string())),
        }
    }

    fn validate_size(len: u64, config: &ImageConfig) -> Result<(), ImageError> {
        if len > config.max_file_size {
            log::warn!(
                "⚠️ 上传文件过大：{:.2} MB（限制：{:.2} MB）",
                len as f64 / 1024.0 / 1024.0,
                config.max_file_size as f64 / 1024.0 / 1024.0
            );
            return Err(ImageError::TooLarge {
                actual: len,
                limit: config.max_file_size,
            });
        }
        Ok(())
    }

    /// 上传流读取：将分块追加到缓冲，超过上限立即返回错误。
    ///
    /// 返回错误时缓冲内容不再有效，调用方应直接丢弃。
    pub(crate) fn push_chunk_with_limit(
        buffer: &mut Vec<u8>,
        chunk: &[u8],
        config: &ImageConfig,
    ) -> Result<(), ImageError> {
        let next_len = (buffer.len() as u64)
            .checked_add(chunk.len() as u64)
            .ok_or_else(|| ImageError::Internal("上传体积计数溢出".to_string()))?;
        Self::validate_size(next_len, config)?;

        if buffer.capacity() == 0 {
            buffer.reserve(BUFFER_INITIAL_CAPACITY.min(config.max_file_size as usize));
        }
        buffer.extend_from_slice(chunk);
        Ok(())
    }

    fn validate_image_signature(bytes: &[u8]) -> Result<(), ImageError> {
        let kind = infer::get(bytes)
            .ok_or_else(|| ImageError::InvalidImage("unrecognized file signature".to_string()))?;

        if kind.matcher_type() != infer::MatcherType::Image {
            return Err(ImageError::InvalidImage(format!(
                "file signature is {}, not an image",
                kind.mime_type()
            )));
        }

        Ok(())
    }
}

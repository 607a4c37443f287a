//! # 解码与归一化流水线模块
//!
//! ## 设计思路
//!
//! 将“字节 → 图像 → L/RGB”的过程集中管理，并在关键节点增加资源上限控制。
//! 优先做格式与尺寸检查，再进行完整解码，降低恶意输入触发高内存开销的风险。
//!
//! ## 实现思路
//!
//! 1. 按内容猜测格式，仅接受 PNG / JPEG
//! 2. 读取 header 尺寸，按像素上限快速拒绝
//! 3. 在 `image::Limits` 约束下完整解码，解码器 panic 也折算为“无效图片”
//! 4. 归一化模式：8 位灰度与 8 位 RGB 保持不变，其余一律转 RGB；
//!    1 位黑白 PNG 虽被解码器展开为 8 位灰度，仍按二值图转为 RGB

use image::{DynamicImage, ImageFormat, ImageReader, Limits};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};

use super::source::{DecodedImage, UploadedImage};
use super::{ImageConfig, ImageError, ImageHandler};

impl ImageHandler {
    /// 将上传字节解码为归一化后的像素缓冲。
    pub(super) fn decode_and_normalize(
        upload: &UploadedImage,
        config: &ImageConfig,
    ) -> Result<DecodedImage, ImageError> {
        let format = image::guess_format(&upload.bytes)
            .map_err(|e| ImageError::InvalidImage(format!("unknown format: {}", e)))?;
        if !matches!(format, ImageFormat::Png | ImageFormat::Jpeg) {
            return Err(ImageError::InvalidImage(format!(
                "format {:?} is not PNG or JPEG",
                format
            )));
        }

        let (header_width, header_height) = Self::inspect_dimensions(&upload.bytes, format)?;
        Self::validate_pixel_limits(config, header_width, header_height)?;

        let decoded = Self::decode_guarded(&upload.bytes, format, config)?;
        if (decoded.width(), decoded.height()) != (header_width, header_height) {
            return Err(ImageError::InvalidImage(
                "decoded dimensions do not match header".to_string(),
            ));
        }

        let bilevel = format == ImageFormat::Png && is_bilevel_png(&upload.bytes);
        let normalized = Self::normalize_mode(decoded, bilevel);
        let (width, height) = normalized.dimensions();
        log::debug!(
            "🧩 解码完成：{:?} {}x{} 模式={:?}",
            format,
            width,
            height,
            normalized.mode()
        );

        Ok(normalized)
    }

    /// 仅通过图片头信息读取宽高。
    fn inspect_dimensions(bytes: &[u8], format: ImageFormat) -> Result<(u32, u32), ImageError> {
        let reader = ImageReader::with_format(Cursor::new(bytes), format);
        reader
            .into_dimensions()
            .map_err(|e| ImageError::InvalidImage(format!("unreadable header: {}", e)))
    }

    /// 校验像素数量是否为正且不超过配置上限。
    fn validate_pixel_limits(
        config: &ImageConfig,
        width: u32,
        height: u32,
    ) -> Result<(), ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::InvalidImage(format!(
                "degenerate dimensions {}x{}",
                width, height
            )));
        }

        let pixels = u64::from(width) * u64::from(height);
        if pixels > config.max_decoded_pixels {
            return Err(ImageError::InvalidImage(format!(
                "{} pixels exceeds limit of {}",
                pixels, config.max_decoded_pixels
            )));
        }

        Ok(())
    }

    /// 完整解码。
    ///
    /// 第三方解码器遇到畸形输入时可能 panic，这里统一捕获并折算为 `InvalidImage`。
    fn decode_guarded(
        bytes: &[u8],
        format: ImageFormat,
        config: &ImageConfig,
    ) -> Result<DynamicImage, ImageError> {
        let mut limits = Limits::default();
        limits.max_alloc = Some(config.max_decoded_bytes);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            let mut reader = ImageReader::with_format(Cursor::new(bytes), format);
            reader.limits(limits);
            reader.decode()
        }));

        match outcome {
            Ok(Ok(image)) => Ok(image),
            Ok(Err(e)) => Err(ImageError::InvalidImage(e.to_string())),
            Err(_) => {
                log::error!("❌ 解码器 panic，已按无效图片处理");
                Err(ImageError::InvalidImage("decoder failure".to_string()))
            }
        }
    }

    fn normalize_mode(image: DynamicImage, bilevel: bool) -> DecodedImage {
        match image {
            DynamicImage::ImageLuma8(gray) if !bilevel => DecodedImage::Luma(gray),
            DynamicImage::ImageRgb8(rgb) => DecodedImage::Rgb(rgb),
            other => DecodedImage::Rgb(other.to_rgb8()),
        }
    }
}

/// IHDR 固定位于签名之后：长度(4) + "IHDR"(4) + 宽(4) + 高(4) + 位深(1) + 颜色类型(1)。
const IHDR_TAG: std::ops::Range<usize> = 12..16;
const IHDR_BIT_DEPTH: usize = 24;
const IHDR_COLOR_TYPE: usize = 25;

/// 是否为 1 位灰度（黑白）PNG。
fn is_bilevel_png(bytes: &[u8]) -> bool {
    bytes.len() > IHDR_COLOR_TYPE
        && &bytes[IHDR_TAG] == b"IHDR"
        && bytes[IHDR_BIT_DEPTH] == 1
        && bytes[IHDR_COLOR_TYPE] == 0
}

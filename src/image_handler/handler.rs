//! # 核心编排模块
//!
//! ## 设计思路
//!
//! `ImageHandler` 只负责流程编排，不直接与 HTTP 绑定。
//! 处理链路固定为：
//! 1. 校验声明类型 / 空文件 / 体积 / 文件签名
//! 2. 解码并归一化为 L 或 RGB
//! 3. 校验 phase
//! 4. 执行对应滤镜
//! 5. 编码为 PNG Data URL
//!
//! ## 实现思路
//!
//! - 配置在构造时固定，请求之间只读共享，不存在处理中途配置漂移。
//! - 整条链路是同步 CPU 计算，由服务层放到阻塞线程池执行。
//! - 记录 `validate/decode/filter/encode/total` 阶段耗时，便于性能诊断。

use std::time::Instant;

use super::source::UploadedImage;
use super::{ImageConfig, ImageError, Phase, encoder, filters};

/// 单次处理的输出。
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    pub phase: Phase,
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

/// 图片处理器。
#[derive(Debug, Clone)]
pub struct ImageHandler {
    config: ImageConfig,
}

impl ImageHandler {
    /// 根据配置创建处理器。
    ///
    /// # 示例
    /// ```rust
    /// use phase_sim::image_handler::{ImageConfig, ImageHandler};
    ///
    /// let handler = ImageHandler::new(ImageConfig::default());
    /// assert_eq!(handler.config().max_file_size, 10 * 1024 * 1024);
    /// ```
    pub fn new(config: ImageConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ImageConfig {
        &self.config
    }

    /// 处理主入口：校验、解码、滤镜、编码。
    ///
    /// 任一阶段失败都直接返回错误，不产生部分结果。
    pub fn process(&self, upload: UploadedImage, phase: &str) -> Result<ProcessOutcome, ImageError> {
        let config = &self.config;
        let total_start = Instant::now();

        let validate_start = Instant::now();
        Self::validate_upload(&upload, config)?;
        let validate_elapsed = validate_start.elapsed();

        let decode_start = Instant::now();
        let decoded = Self::decode_and_normalize(&upload, config)?;
        let decode_elapsed = decode_start.elapsed();
        // 解码后原始字节不再需要
        drop(upload);

        let phase = Phase::parse(phase)?;
        let (width, height) = decoded.dimensions();
        let mode = decoded.mode();

        let filter_start = Instant::now();
        let processed = filters::apply_phase(&decoded, phase, config);
        let filter_elapsed = filter_start.elapsed();
        debug_assert_eq!(processed.dimensions(), (width, height));
        debug_assert_eq!(processed.mode(), mode);

        let encode_start = Instant::now();
        let data_url = encoder::to_png_data_url(&processed)?;
        let encode_elapsed = encode_start.elapsed();

        let total_elapsed = total_start.elapsed();
        log::info!(
            "✅ 图片处理完成 - phase={} size={}x{} mode={:?} validate={}ms decode={}ms filter={}ms encode={}ms total={}ms",
            phase.as_str(),
            width,
            height,
            mode,
            validate_elapsed.as_millis(),
            decode_elapsed.as_millis(),
            filter_elapsed.as_millis(),
            encode_elapsed.as_millis(),
            total_elapsed.as_millis()
        );

        Ok(ProcessOutcome {
            phase,
            width,
            height,
            data_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_handler::encoder::PNG_DATA_URL_PREFIX;
    use base64::{Engine as _, engine::general_purpose};
    use image::{DynamicImage, GenericImageView, ImageBuffer, ImageFormat, Rgb, Rgba};
    use std::io::Cursor;

    fn create_png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = ImageBuffer::from_fn(width, height, |x, y| {
            let r = (x % 255) as u8;
            let g = (y % 255) as u8;
            let b = ((x + y) % 255) as u8;
            Rgba([r, g, b, 255])
        });

        let dyn_img = DynamicImage::ImageRgba8(img);
        let mut cursor = Cursor::new(Vec::new());
        dyn_img
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("failed to encode test image");
        cursor.into_inner()
    }

    fn decode_data_url(data_url: &str) -> DynamicImage {
        let payload = data_url
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .expect("data url prefix");
        let png = general_purpose::STANDARD
            .decode(payload)
            .expect("valid base64");
        image::load_from_memory_with_format(&png, ImageFormat::Png).expect("valid png")
    }

    #[test]
    fn arterial_keeps_dimensions() {
        let handler = ImageHandler::new(ImageConfig::default());
        let png = create_png_bytes(64, 48);

        let outcome = handler
            .process(UploadedImage::new(png, "image/png"), "arterial")
            .expect("arterial should succeed");

        assert_eq!(outcome.phase, Phase::Arterial);
        assert_eq!((outcome.width, outcome.height), (64, 48));
        assert_eq!(decode_data_url(&outcome.data_url).dimensions(), (64, 48));
    }

    #[test]
    fn venous_keeps_dimensions_and_smooths() {
        let handler = ImageHandler::new(ImageConfig::default());
        let noisy = ImageBuffer::from_fn(40, 30, |x, y| {
            let v = if (x * 7 + y * 13) % 3 == 0 { 230 } else { 20 };
            Rgb([v, v / 2, 255 - v])
        });
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(noisy.clone())
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode");

        let outcome = handler
            .process(UploadedImage::new(cursor.into_inner(), "image/png"), "Venous")
            .expect("venous should succeed");

        let output = decode_data_url(&outcome.data_url).to_rgb8();
        assert_eq!(output.dimensions(), (40, 30));
        let spread = |buf: &[u8]| {
            let mean = buf.iter().map(|&v| f64::from(v)).sum::<f64>() / buf.len() as f64;
            buf.iter().map(|&v| (f64::from(v) - mean).powi(2)).sum::<f64>() / buf.len() as f64
        };
        assert!(spread(output.as_raw()) <= spread(noisy.as_raw()));
    }

    #[test]
    fn invalid_image_wins_over_invalid_phase() {
        let handler = ImageHandler::new(ImageConfig::default());
        let mut bytes = create_png_bytes(8, 8);
        bytes.truncate(20);

        let result = handler.process(UploadedImage::new(bytes, "image/png"), "contrast");

        assert!(matches!(result, Err(ImageError::InvalidImage(_))));
    }

    #[test]
    fn invalid_phase_is_rejected_after_decode() {
        let handler = ImageHandler::new(ImageConfig::default());

        let result = handler.process(
            UploadedImage::new(create_png_bytes(8, 8), "image/png"),
            "contrast",
        );

        assert!(matches!(result, Err(ImageError::InvalidPhase(_))));
    }

    #[test]
    fn empty_file_wins_over_invalid_phase() {
        let handler = ImageHandler::new(ImageConfig::default());

        let result = handler.process(UploadedImage::new(Vec::new(), "image/jpeg"), "nonsense");

        assert!(matches!(result, Err(ImageError::EmptyFile)));
    }

    #[test]
    fn perf_process_multiple_sizes() {
        let handler = ImageHandler::new(ImageConfig::default());
        let cases = [(256, 256), (1024, 768)];

        for (width, height) in cases {
            let png = create_png_bytes(width, height);
            for phase in ["arterial", "venous"] {
                let start = Instant::now();
                let outcome = handler
                    .process(UploadedImage::new(png.clone(), "image/png"), phase)
                    .expect("process should succeed");
                println!(
                    "[perf] {} {}x{} input={}KB output={}KB elapsed={}ms",
                    phase,
                    width,
                    height,
                    png.len() / 1024,
                    outcome.data_url.len() / 1024,
                    start.elapsed().as_millis()
                );
                assert_eq!((outcome.width, outcome.height), (width, height));
            }
        }
    }
}

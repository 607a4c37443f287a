//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `ImageServiceState` 作为 axum 路由共享状态，替代全局单例函数。
//! 好处：
//! 1. 生命周期清晰（由 `main.rs` 统一构建）
//! 2. 测试可创建独立实例，互不影响
//! 3. 内部只持有只读配置，请求之间无共享可变状态
//!
//! ## 实现思路
//!
//! `process_upload` 将 CPU 密集的解码/滤镜/编码放到 `spawn_blocking`，
//! 避免阻塞 async worker；阻塞任务 panic 时折算为 `Internal` 错误。
//!
//! 单个任务的峰值内存与图像尺寸成正比，因此用 `Semaphore` 限制同时运行的任务数，
//! 许可随任务一起移入阻塞线程，任务结束即释放。

use std::sync::Arc;

use tokio::sync::Semaphore;

use super::handler::ProcessOutcome;
use super::source::UploadedImage;
use super::{ImageConfig, ImageError, ImageHandler};

/// 图片处理服务状态。
///
/// `Clone` 仅复制 `Arc`，可直接作为 axum `State` 使用。
#[derive(Debug, Clone)]
pub struct ImageServiceState {
    handler: Arc<ImageHandler>,
    permits: Arc<Semaphore>,
}

impl ImageServiceState {
    /// 使用默认配置创建服务状态。
    pub fn new() -> Self {
        Self::with_config(ImageConfig::default())
    }

    /// 使用自定义配置创建服务状态。
    ///
    /// # 示例
    /// ```rust
    /// use phase_sim::image_handler::{ImageConfig, ImageServiceState};
    ///
    /// let service = ImageServiceState::with_config(ImageConfig::with_max_file_size(1024));
    /// assert_eq!(service.config().max_file_size, 1024);
    /// ```
    pub fn with_config(config: ImageConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));
        Self {
            handler: Arc::new(ImageHandler::new(config)),
            permits,
        }
    }

    pub fn config(&self) -> &ImageConfig {
        self.handler.config()
    }

    /// 执行完整处理流程：校验→解码→滤镜→编码。
    pub async fn process_upload(
        &self,
        upload: UploadedImage,
        phase: String,
    ) -> Result<ProcessOutcome, ImageError> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| {
                log::error!("❌ 处理任务许可获取失败：{}", e);
                ImageError::Internal("processing queue closed".to_string())
            })?;

        let handler = Arc::clone(&self.handler);
        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            handler.process(upload, &phase)
        })
        .await
        .map_err(|e| {
            log::error!("❌ 图片处理任务异常终止：{}", e);
            ImageError::Internal("processing task failed".to_string())
        })?
    }
}

impl Default for ImageServiceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat, Luma};
    use std::io::Cursor;

    fn gray_png() -> Vec<u8> {
        let gray = GrayImage::from_fn(10, 10, |x, y| Luma([(x * 20 + y) as u8]));
        let mut cursor = Cursor::new(Vec::new());
        DynamicImage::ImageLuma8(gray)
            .write_to(&mut cursor, ImageFormat::Png)
            .expect("encode");
        cursor.into_inner()
    }

    #[tokio::test]
    async fn process_upload_runs_on_blocking_pool() {
        let service = ImageServiceState::new();

        let outcome = service
            .process_upload(UploadedImage::new(gray_png(), "image/png"), "venous".into())
            .await
            .expect("should succeed");

        assert_eq!((outcome.width, outcome.height), (10, 10));
        assert!(outcome.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn concurrent_requests_do_not_interfere() {
        let service = ImageServiceState::new();
        let png = gray_png();

        let a = service.process_upload(UploadedImage::new(png.clone(), "image/png"), "arterial".into());
        let b = service.process_upload(UploadedImage::new(png.clone(), "image/png"), "venous".into());
        let c = service.process_upload(UploadedImage::new(png, "image/png"), "bogus".into());
        let (a, b, c) = tokio::join!(a, b, c);

        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(matches!(c, Err(ImageError::InvalidPhase(_))));
        assert_ne!(a.unwrap().data_url, b.unwrap().data_url);
    }

    #[tokio::test]
    async fn single_job_limit_still_serves_every_request() {
        let config = ImageConfig {
            max_concurrent_jobs: 1,
            ..ImageConfig::default()
        };
        let service = ImageServiceState::with_config(config);
        let png = gray_png();

        let jobs = ["arterial", "venous", "arterial", "venous"].map(|phase| {
            service.process_upload(UploadedImage::new(png.clone(), "image/png"), phase.into())
        });
        let [a, b, c, d] = jobs;
        let (a, b, c, d) = tokio::join!(a, b, c, d);

        for result in [a, b, c, d] {
            let outcome = result.expect("queued job should succeed");
            assert_eq!((outcome.width, outcome.height), (10, 10));
        }
        assert_eq!(service.permits.available_permits(), 1);
    }
}

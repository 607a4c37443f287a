//! # 配置模块
//!
//! ## 设计思路
//!
//! 将所有“固定策略”集中到 `ImageConfig`：上传限制、解码限制、两种 phase 的滤镜参数。
//! 单次请求内使用同一份不可变配置，由 `Arc` 在请求之间共享。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产使用的参数（10MB、1.6x 对比度、1.12x 饱和度、7x7 / σ=1.5 高斯）。
//! - `Phase` 负责 phase 字符串解析与反向输出。
//! - `is_allowed_content_type` 统一做 MIME 归一化后的白名单判断。

use super::ImageError;

pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;
/// 无法探测 CPU 数量时的并发任务数。
const DEFAULT_CONCURRENT_JOBS: usize = 4;

/// 图片处理配置。
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// 上传文件允许的最大体积（字节）。
    pub max_file_size: u64,
    /// 允许的声明类型（已归一化为小写、无参数）。
    pub allowed_content_types: Vec<String>,
    /// 解码后的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 解码器允许分配的内存上限（字节）。
    pub max_decoded_bytes: u64,
    /// 同时执行的处理任务上限，超出的请求排队等待。
    pub max_concurrent_jobs: usize,
    /// arterial：对比度增强倍数。
    pub arterial_contrast: f32,
    /// arterial：RGB 图像额外的饱和度增强倍数。
    pub arterial_saturation: f32,
    /// venous：高斯核边长（奇数）。
    pub venous_kernel_size: usize,
    /// venous：高斯标准差。
    pub venous_sigma: f32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_content_types: vec![
                "image/png".to_string(),
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
            ],
            max_decoded_pixels: 40_000_000,
            max_decoded_bytes: 160 * 1024 * 1024,
            max_concurrent_jobs: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(DEFAULT_CONCURRENT_JOBS),
            arterial_contrast: 1.6,
            arterial_saturation: 1.12,
            venous_kernel_size: 7,
            venous_sigma: 1.5,
        }
    }
}

impl ImageConfig {
    /// 以指定上传上限构建配置，其余参数取默认值。
    pub fn with_max_file_size(max_file_size: u64) -> Self {
        Self {
            max_file_size,
            ..Self::default()
        }
    }

    /// 判断声明类型是否在白名单内。
    ///
    /// 会忽略大小写、首尾空白以及 `;` 之后的参数（如 `charset`）。
    pub fn is_allowed_content_type(&self, declared: &str) -> bool {
        let normalized = normalize_content_type(declared);
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed == &normalized)
    }
}

pub(crate) fn normalize_content_type(declared: &str) -> String {
    declared
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// 期相选择。
///
/// - `Arterial`：动脉期，对比度（及饱和度）增强
/// - `Venous`：静脉期，高斯平滑
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Arterial,
    Venous,
}

impl Phase {
    /// 从外部字符串解析期相。
    ///
    /// # 示例
    /// ```rust
    /// use phase_sim::image_handler::Phase;
    ///
    /// let p = Phase::parse(" Arterial ")?;
    /// assert_eq!(p, Phase::Arterial);
    /// # Ok::<(), phase_sim::image_handler::ImageError>(())
    /// ```
    pub fn parse(phase: &str) -> Result<Self, ImageError> {
        match phase.trim().to_lowercase().as_str() {
            "arterial" => Ok(Self::Arterial),
            "venous" => Ok(Self::Venous),
            other => Err(ImageError::InvalidPhase(other.to_string())),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Arterial => "arterial",
            Self::Venous => "venous",
        }
    }
}

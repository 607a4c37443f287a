//! # 图片处理模块（image_handler）
//!
//! ## 设计思路
//!
//! 该模块将“上传接收 → 校验 → 解码归一化 → 期相滤镜 → PNG 编码”
//! 按职责拆分为多个子模块，避免单文件膨胀与耦合。
//!
//! - `commands`：仅做 multipart 入参 / JSON 出参适配（薄封装）
//! - `service`：承载共享状态（`ImageServiceState`），调度阻塞线程池
//! - `handler`：编排整条处理流水线
//! - `loader`：声明类型、空文件、体积、文件签名校验
//! - `pipeline`：解码、完整性检查、像素限制、模式归一化
//! - `filters`：对比度 / 饱和度 / 高斯平滑
//! - `encoder`：PNG 编码与 Data URL 包装
//! - `config/error/source`：配置、错误、中间数据模型
//!
//! ## 新同事快速上手
//!
//! 可以按下面顺序理解调用链：
//!
//! ```text
//! POST /process (multipart)
//!    ↓
//! commands.rs（字段读取 + 流式体积限制）
//!    ↓
//! service.rs（spawn_blocking）
//!    ↓
//! handler.rs（统一编排 + 阶段耗时日志）
//!    ├─ loader.rs（类型 / 空 / 体积 / 签名）
//!    ├─ pipeline.rs（解码 + 归一化为 L / RGB）
//!    ├─ filters.rs（arterial：对比度+饱和度；venous：7x7 高斯）
//!    └─ encoder.rs（PNG → base64 Data URL）
//!    ↓
//! 返回 JSON 或 AppError
//! ```
//!
//! ## 分层职责建议
//!
//! - 接口字段变更优先改 `commands.rs`
//! - 阈值与滤镜参数变更优先改 `config.rs`
//! - 校验顺序变更优先改 `handler.rs`
//! - 单阶段行为优化分别改 `loader/pipeline/filters/encoder`

pub mod commands;
mod config;
mod encoder;
mod error;
mod filters;
mod handler;
mod loader;
mod pipeline;
mod service;
mod source;

pub use commands::{ProcessImageResponse, process_image};
pub use config::{DEFAULT_MAX_FILE_SIZE, ImageConfig, Phase};
pub use encoder::PNG_DATA_URL_PREFIX;
pub use error::ImageError;
pub use handler::{ImageHandler, ProcessOutcome};
pub use service::ImageServiceState;
pub use source::{ColorMode, DecodedImage, ProcessedImage, UploadedImage};

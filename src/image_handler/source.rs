//! # 数据源与中间模型
//!
//! ## 设计思路
//!
//! 将“外部输入”和“流水线中间结果”解耦：
//! - `UploadedImage` 表示已读取但未解码的上传内容
//! - `DecodedImage` 表示已归一化为 L / RGB 的像素缓冲
//! - `ProcessedImage` 表示滤镜输出，尺寸与模式与输入一致
//!
//! 三者都只在单次请求内存在，由处理函数独占所有权。

use image::{GrayImage, RgbImage};

/// 上传阶段输出：原始字节与声明类型。
#[derive(Debug, Clone)]
pub struct UploadedImage {
    /// 原始文件字节。
    pub bytes: Vec<u8>,
    /// multipart 中声明的 Content-Type（原样保留，校验时再归一化）。
    pub content_type: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            content_type: Some(content_type.into()),
        }
    }
}

/// 颜色模式，只允许两种。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorMode {
    /// 8 位灰度。
    Luma,
    /// 8 位三通道。
    Rgb,
}

/// 解码阶段输出：已归一化模式的像素缓冲。
#[derive(Debug, Clone)]
pub enum DecodedImage {
    Luma(GrayImage),
    Rgb(RgbImage),
}

impl DecodedImage {
    pub fn mode(&self) -> ColorMode {
        match self {
            Self::Luma(_) => ColorMode::Luma,
            Self::Rgb(_) => ColorMode::Rgb,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Luma(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }
}

/// 滤镜阶段输出。
///
/// 与 `DecodedImage` 同构，单独建模以便在类型上区分“处理前/处理后”。
#[derive(Debug, Clone)]
pub enum ProcessedImage {
    Luma(GrayImage),
    Rgb(RgbImage),
}

impl ProcessedImage {
    pub fn mode(&self) -> ColorMode {
        match self {
            Self::Luma(_) => ColorMode::Luma,
            Self::Rgb(_) => ColorMode::Rgb,
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            Self::Luma(img) => img.dimensions(),
            Self::Rgb(img) => img.dimensions(),
        }
    }
}

//! # 编码模块
//!
//! 处理结果统一编码为 PNG，再包装成可直接嵌入前端 `<img src>` 的 Data URL。

use base64::{Engine as _, engine::general_purpose};
use image::{ImageFormat, ImageResult};
use std::io::Cursor;

use super::ImageError;
use super::source::ProcessedImage;

pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// 编码为 PNG 字节。
pub(crate) fn encode_png(image: &ProcessedImage) -> Result<Vec<u8>, ImageError> {
    let mut cursor = Cursor::new(Vec::new());
    let written: ImageResult<()> = match image {
        ProcessedImage::Luma(gray) => gray.write_to(&mut cursor, ImageFormat::Png),
        ProcessedImage::Rgb(rgb) => rgb.write_to(&mut cursor, ImageFormat::Png),
    };
    written.map_err(|e| ImageError::Encode(format!("PNG encode failed: {}", e)))?;
    Ok(cursor.into_inner())
}

/// 编码为 `data:image/png;base64,...` 字符串。
pub(crate) fn to_png_data_url(image: &ProcessedImage) -> Result<String, ImageError> {
    let png = encode_png(image)?;
    let encoded = general_purpose::STANDARD.encode(&png);

    let mut data_url = String::with_capacity(PNG_DATA_URL_PREFIX.len() + encoded.len());
    data_url.push_str(PNG_DATA_URL_PREFIX);
    data_url.push_str(&encoded);
    Ok(data_url)
}

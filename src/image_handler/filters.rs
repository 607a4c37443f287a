//! # 滤镜模块
//!
//! ## 设计思路
//!
//! 两种期相各对应一个固定滤镜：
//! - arterial：以全图平均亮度为中心拉伸对比度；RGB 图像再以逐像素亮度为中心拉伸饱和度
//! - venous：可分离的 7x7 高斯平滑，边界按 reflect-101 镜像
//!
//! ## 实现思路
//!
//! 所有滤镜都是纯函数，输入借用、输出新缓冲，尺寸与通道数不变。
//! 亮度统一使用 16 位定点系数，保证灰度与 RGB 路径的结果可复现。

use image::{GrayImage, ImageBuffer, Pixel, RgbImage};

use super::source::{DecodedImage, ProcessedImage};
use super::{ImageConfig, Phase};

/// 按期相对归一化后的图像执行对应滤镜。
pub(crate) fn apply_phase(image: &DecodedImage, phase: Phase, config: &ImageConfig) -> ProcessedImage {
    match (phase, image) {
        (Phase::Arterial, DecodedImage::Luma(gray)) => {
            ProcessedImage::Luma(enhance_contrast_luma(gray, config.arterial_contrast))
        }
        (Phase::Arterial, DecodedImage::Rgb(rgb)) => {
            let contrasted = enhance_contrast_rgb(rgb, config.arterial_contrast);
            ProcessedImage::Rgb(enhance_saturation(&contrasted, config.arterial_saturation))
        }
        (Phase::Venous, DecodedImage::Luma(gray)) => ProcessedImage::Luma(gaussian_blur(
            gray,
            config.venous_kernel_size,
            config.venous_sigma,
        )),
        (Phase::Venous, DecodedImage::Rgb(rgb)) => ProcessedImage::Rgb(gaussian_blur(
            rgb,
            config.venous_kernel_size,
            config.venous_sigma,
        )),
    }
}

/// RGB → 亮度，ITU-R 601-2 系数的 16 位定点形式。
#[inline]
pub(crate) fn luma_of(r: u8, g: u8, b: u8) -> u8 {
    ((u32::from(r) * 19_595 + u32::from(g) * 38_470 + u32::from(b) * 7_471 + 0x8000) >> 16) as u8
}

/// 以 `center` 为基准做线性插值/外推，结果截断到 `[0, 255]`。
#[inline]
fn blend(center: u8, value: u8, factor: f32) -> u8 {
    let out = f32::from(center) + factor * (f32::from(value) - f32::from(center));
    if out <= 0.0 {
        0
    } else if out >= 255.0 {
        255
    } else {
        out as u8
    }
}

/// 平均亮度，四舍五入为整数。
fn mean_luma<I: Iterator<Item = u8>>(values: I) -> u8 {
    let (sum, count) = values.fold((0u64, 0u64), |(sum, count), v| (sum + u64::from(v), count + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64 + 0.5).floor().min(255.0) as u8
}

pub(crate) fn enhance_contrast_luma(image: &GrayImage, factor: f32) -> GrayImage {
    let mean = mean_luma(image.as_raw().iter().copied());
    let lut = contrast_lut(mean, factor);
    let mut out = image.clone();
    for value in out.iter_mut() {
        *value = lut[usize::from(*value)];
    }
    out
}

pub(crate) fn enhance_contrast_rgb(image: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luma(image.pixels().map(|p| luma_of(p[0], p[1], p[2])));
    let lut = contrast_lut(mean, factor);
    let mut out = image.clone();
    for value in out.iter_mut() {
        *value = lut[usize::from(*value)];
    }
    out
}

fn contrast_lut(mean: u8, factor: f32) -> [u8; 256] {
    let mut lut = [0u8; 256];
    for (value, slot) in lut.iter_mut().enumerate() {
        *slot = blend(mean, value as u8, factor);
    }
    lut
}

/// 饱和度增强：每个像素以自身亮度为中心外推。
pub(crate) fn enhance_saturation(image: &RgbImage, factor: f32) -> RgbImage {
    let mut out = image.clone();
    for pixel in out.pixels_mut() {
        let [r, g, b] = pixel.0;
        let gray = luma_of(r, g, b);
        pixel.0 = [blend(gray, r, factor), blend(gray, g, factor), blend(gray, b, factor)];
    }
    out
}

/// 归一化的一维高斯核，长度为 `size`（奇数）。
pub(crate) fn gaussian_kernel(size: usize, sigma: f32) -> Vec<f32> {
    let size = size.max(1) | 1;
    let half = (size / 2) as f32;
    let denom = 2.0 * sigma * sigma;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - half;
            (-(d * d) / denom).exp()
        })
        .collect();
    let sum: f32 = kernel.iter().sum();
    for k in &mut kernel {
        *k /= sum;
    }
    kernel
}

/// reflect-101 下标映射：`gfedcb|abcdefgh|gfedcba`。
#[inline]
fn reflect_101(index: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let mut i = index.rem_euclid(period);
    if i >= len as isize {
        i = period - i;
    }
    i as usize
}

/// 可分离高斯平滑，按通道独立处理。
///
/// 横向结果保留浮点，避免两次取整；只在环形缓冲中保留纵向窗口需要的
/// `kernel.len()` 行，额外内存与图像高度无关。
pub(crate) fn gaussian_blur<P>(
    image: &ImageBuffer<P, Vec<u8>>,
    kernel_size: usize,
    sigma: f32,
) -> ImageBuffer<P, Vec<u8>>
where
    P: Pixel<Subpixel = u8>,
{
    let (width, height) = image.dimensions();
    let (w, h) = (width as usize, height as usize);
    let channels = usize::from(P::CHANNEL_COUNT);
    let stride = w * channels;
    let kernel = gaussian_kernel(kernel_size, sigma);
    let taps = kernel.len();
    let radius = (taps / 2) as isize;
    let src = image.as_raw();

    // 槽位 = 源行号 % taps，同一输出行所需的源行落在连续 taps 行内，互不冲突
    let mut ring = vec![0f32; taps * stride];
    let mut ring_rows: Vec<Option<usize>> = vec![None; taps];
    let mut acc = vec![0f32; stride];

    let mut out = ImageBuffer::<P, Vec<u8>>::new(width, height);
    let dst: &mut [u8] = &mut out;

    for y in 0..h {
        acc.fill(0.0);
        for (k, weight) in kernel.iter().enumerate() {
            let sy = reflect_101(y as isize + k as isize - radius, h);
            let slot = sy % taps;
            let row = &mut ring[slot * stride..(slot + 1) * stride];
            if ring_rows[slot] != Some(sy) {
                blur_row(&src[sy * stride..(sy + 1) * stride], row, &kernel, channels);
                ring_rows[slot] = Some(sy);
            }
            for (a, v) in acc.iter_mut().zip(row.iter()) {
                *a += weight * v;
            }
        }
        for (d, a) in dst[y * stride..(y + 1) * stride].iter_mut().zip(&acc) {
            *d = a.round().clamp(0.0, 255.0) as u8;
        }
    }

    out
}

/// 单行横向卷积，结果写入 `out`。
fn blur_row(src: &[u8], out: &mut [f32], kernel: &[f32], channels: usize) {
    let w = src.len() / channels;
    let radius = (kernel.len() / 2) as isize;
    for x in 0..w {
        for c in 0..channels {
            let mut acc = 0f32;
            for (k, weight) in kernel.iter().enumerate() {
                let sx = reflect_101(x as isize + k as isize - radius, w);
                acc += weight * f32::from(src[sx * channels + c]);
            }
            out[x * channels + c] = acc;
        }
    }
}

//! # 编码桥（Encode Bridge）
//!
//! ## 设计思路
//!
//! 控制器只依赖 `EncodeBridge` 这一个不透明接口：给定（路径、质量、格式），
//! 返回编码后的字节或一个通用错误。失败不重试，由用户改动参数隐式重试。
//!
//! ## 实现思路
//!
//! `NativeEncoder` 是生产实现：
//! 1. 读取源文件并做体积 / 签名校验
//! 2. 读取图片头尺寸，按像素上限快速拒绝
//! 3. 完整解码
//! 4. 按目标格式编码（CPU 密集部分放在 `spawn_blocking`）

use std::io::Cursor;
use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder};

use super::source::validate_image_signature;
use super::{CompressConfig, CompressError, CompressParams, ImageFormat};

/// 外部重压缩服务接口。
#[async_trait]
pub trait EncodeBridge: Send + Sync {
    async fn encode(&self, source_path: &str, params: CompressParams) -> Result<Vec<u8>, CompressError>;
}

/// 基于 `image` crate 的本地编码器。
pub struct NativeEncoder {
    config: Arc<RwLock<CompressConfig>>,
}

impl NativeEncoder {
    pub fn new(config: Arc<RwLock<CompressConfig>>) -> Self {
        Self { config }
    }

    fn config_snapshot(&self) -> Result<CompressConfig, CompressError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| CompressError::Panel("配置读取锁已中毒".to_string()))
    }
}

#[async_trait]
impl EncodeBridge for NativeEncoder {
    async fn encode(&self, source_path: &str, params: CompressParams) -> Result<Vec<u8>, CompressError> {
        let config = self.config_snapshot()?;
        let path = source_path.to_string();

        tokio::task::spawn_blocking(move || encode_file(Path::new(&path), params, &config))
            .await
            .map_err(|e| CompressError::Encode(format!("编码任务异常退出：{}", e)))?
    }
}

/// 读取并重新编码一个图片文件。
pub fn encode_file(
    path: &Path,
    params: CompressParams,
    config: &CompressConfig,
) -> Result<Vec<u8>, CompressError> {
    let start = Instant::now();

    let metadata = std::fs::metadata(path)
        .map_err(|e| CompressError::SourceUnreadable(format!("无法读取文件信息：{}", e)))?;
    if metadata.len() > config.max_file_size {
        return Err(CompressError::ResourceLimit(format!(
            "文件过大：{:.2} MB（限制：{:.2} MB）",
            metadata.len() as f64 / 1024.0 / 1024.0,
            config.max_file_size as f64 / 1024.0 / 1024.0
        )));
    }

    let bytes = std::fs::read(path)
        .map_err(|e| CompressError::SourceUnreadable(format!("无法读取图片文件：{}", e)))?;
    validate_image_signature(&bytes)?;

    let (width, height) = inspect_dimensions(&bytes)?;
    validate_pixel_limits(config, width, height)?;

    let decoded = image::load_from_memory(&bytes)
        .map_err(|e| CompressError::Decode(format!("图片解码失败：{}", e)))?;

    let encoded = encode_image(&decoded, params)?;

    log::info!(
        "✅ 重压缩完成 - 路径: {} 格式: {} 质量: {} 尺寸: {}x{} {}KB -> {}KB 耗时: {}ms",
        path.display(),
        params.format,
        params.quality,
        width,
        height,
        bytes.len() / 1024,
        encoded.len() / 1024,
        start.elapsed().as_millis()
    );

    Ok(encoded)
}

/// 将已解码图像按参数编码为目标格式字节。
pub fn encode_image(image: &DynamicImage, params: CompressParams) -> Result<Vec<u8>, CompressError> {
    let mut buf = Vec::new();
    let quality = params.quality.get();

    match params.format {
        ImageFormat::Jpeg => {
            // JPEG 不支持透明通道，且质量下限为 1
            let rgb = image.to_rgb8();
            JpegEncoder::new_with_quality(&mut buf, quality.max(1))
                .write_image(rgb.as_raw(), rgb.width(), rgb.height(), ExtendedColorType::Rgb8)
                .map_err(|e| CompressError::Encode(format!("JPEG 编码失败：{}", e)))?;
        }
        ImageFormat::Png => {
            let rgba = image.to_rgba8();
            PngEncoder::new_with_quality(&mut buf, png_compression(quality), FilterType::Adaptive)
                .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
                .map_err(|e| CompressError::Encode(format!("PNG 编码失败：{}", e)))?;
        }
        ImageFormat::Webp => {
            log::debug!("WebP 使用无损编码，质量参数 {} 不生效", quality);
            let rgba = image.to_rgba8();
            WebPEncoder::new_lossless(&mut buf)
                .write_image(rgba.as_raw(), rgba.width(), rgba.height(), ExtendedColorType::Rgba8)
                .map_err(|e| CompressError::Encode(format!("WebP 编码失败：{}", e)))?;
        }
    }

    Ok(buf)
}

/// PNG 为无损格式：质量越高，压缩力度越低、速度越快。
fn png_compression(quality: u8) -> CompressionType {
    match quality {
        0..=33 => CompressionType::Best,
        34..=66 => CompressionType::Default,
        _ => CompressionType::Fast,
    }
}

/// 仅通过内存中的图片头信息读取宽高。
fn inspect_dimensions(bytes: &[u8]) -> Result<(u32, u32), CompressError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| CompressError::InvalidFormat(format!("无法识别图片格式：{}", e)))?
        .into_dimensions()
        .map_err(|e| CompressError::InvalidFormat(format!("无法读取图片尺寸：{}", e)))
}

fn validate_pixel_limits(config: &CompressConfig, width: u32, height: u32) -> Result<(), CompressError> {
    let pixels = (width as u64)
        .checked_mul(height as u64)
        .ok_or_else(|| CompressError::ResourceLimit("图片像素数溢出".to_string()))?;

    if pixels > config.max_decoded_pixels {
        return Err(CompressError::ResourceLimit(format!(
            "图片像素过大：{} 像素（限制：{} 像素）",
            pixels, config.max_decoded_pixels
        )));
    }

    Ok(())
}

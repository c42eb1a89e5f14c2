//! # 重压缩参数
//!
//! 质量值与目标格式是面板唯一可调的两个参数。
//! `Quality` 以 newtype 形式保证任何时刻都落在 `0..=100` 内：
//! 越界输入一律夹取，而不是报错（滑块抖动不应打断用户）。

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::CompressError;

/// 面板初始质量值。
pub const DEFAULT_QUALITY: u8 = 50;

/// 压缩质量（0–100，含边界）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MIN: u8 = 0;
    pub const MAX: u8 = 100;

    /// 从任意整数构造，越界值夹取到边界。
    pub fn new(value: i64) -> Self {
        Self(value.clamp(Self::MIN as i64, Self::MAX as i64) as u8)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(DEFAULT_QUALITY)
    }
}

impl From<i64> for Quality {
    fn from(value: i64) -> Self {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(quality: Quality) -> Self {
        quality.0
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 目标编码格式。
///
/// 序列化形式与前端下拉框取值一致：`"Jpeg"` / `"Png"` / `"Webp"`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 3] = [Self::Jpeg, Self::Png, Self::Webp];

    /// 小写格式名，同时用作导出文件扩展名与过滤器。
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpeg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// 结果句柄的 MIME 类型（`image/<小写格式名>`）。
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Jpeg => "Jpeg",
            Self::Png => "Png",
            Self::Webp => "Webp",
        };
        f.write_str(name)
    }
}

impl FromStr for ImageFormat {
    type Err = CompressError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "jpeg" | "jpg" => Ok(Self::Jpeg),
            "png" => Ok(Self::Png),
            "webp" => Ok(Self::Webp),
            other => Err(CompressError::InvalidFormat(format!(
                "未知目标格式：{}（可选：Jpeg / Png / Webp）",
                other
            ))),
        }
    }
}

/// 一次重压缩请求的参数组合。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CompressParams {
    pub quality: Quality,
    pub format: ImageFormat,
}

impl CompressParams {
    pub fn new(quality: i64, format: ImageFormat) -> Self {
        Self {
            quality: Quality::new(quality),
            format,
        }
    }
}

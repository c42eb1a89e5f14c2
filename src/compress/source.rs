//! # 源图片解析
//!
//! ## 设计思路
//!
//! 将“用户选择的文件路径”转换为可展示的 `SourceRef`：
//! - 展示地址只由路径推导（Tauri asset 协议），同一路径重复选择结果一致
//! - 原始体积按实际读取的字节数计算
//!
//! 选择被取消不是错误；文件不可读只记录日志并返回 `None`，不向调用方抛出。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;

use super::{CompressConfig, CompressError};

/// 文件对话框抽象。
///
/// 桌面外壳使用 `tauri-plugin-dialog` 实现；测试中可替换为固定返回值。
#[async_trait]
pub trait FileDialogs: Send + Sync {
    /// 单文件、非目录选择。取消时返回 `None`。
    async fn pick_image(&self) -> Option<PathBuf>;

    /// 保存位置选择，预填文件名并仅允许单一扩展名。取消时返回 `None`。
    async fn pick_destination(&self, default_name: &str, extension: &str) -> Option<PathBuf>;
}

/// 已选中的源图片。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRef {
    pub path: String,
    pub display_url: String,
    pub original_size: u64,
}

impl SourceRef {
    pub fn new(path: impl Into<String>, original_size: u64) -> Self {
        let path = path.into();
        let display_url = asset_url(&path);
        Self {
            path,
            display_url,
            original_size,
        }
    }
}

/// 由文件路径推导 webview 可加载的 asset 协议地址。
///
/// 与前端 `convertFileSrc` 的编码规则一致（`encodeURIComponent` 保留字符集）。
pub fn asset_url(path: &str) -> String {
    let mut encoded = String::with_capacity(path.len() * 3);
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            other => encoded.push_str(&format!("%{:02X}", other)),
        }
    }

    if cfg!(windows) {
        format!("http://asset.localhost/{}", encoded)
    } else {
        format!("asset://localhost/{}", encoded)
    }
}

/// 源图片解析器。
pub struct SourceResolver {
    config: CompressConfig,
}

impl SourceResolver {
    pub fn new(config: CompressConfig) -> Self {
        Self { config }
    }

    /// 打开文件选择框并解析所选图片。
    ///
    /// 取消或读取失败时返回 `None`（仅记录日志）。
    pub async fn select(&self, dialogs: &dyn FileDialogs) -> Option<SourceRef> {
        log::debug!("🖼️ 正在选择源图片");

        let Some(path) = dialogs.pick_image().await else {
            log::debug!("选择源图片已取消");
            return None;
        };

        match self.resolve(&path).await {
            Ok(source) => Some(source),
            Err(err) => {
                log::error!("选择源图片失败 - 路径: {} 错误: {}", path.display(), err);
                None
            }
        }
    }

    /// 读取路径对应的文件并生成 `SourceRef`。
    pub async fn resolve(&self, path: &Path) -> Result<SourceRef, CompressError> {
        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| CompressError::SourceUnreadable(format!("无法读取文件信息：{}", e)))?;

        if !metadata.is_file() {
            return Err(CompressError::SourceUnreadable(format!(
                "不是文件：{}",
                path.display()
            )));
        }

        if metadata.len() > self.config.max_file_size {
            return Err(CompressError::ResourceLimit(format!(
                "文件过大：{:.2} MB（限制：{:.2} MB）",
                metadata.len() as f64 / 1024.0 / 1024.0,
                self.config.max_file_size as f64 / 1024.0 / 1024.0
            )));
        }

        let bytes = tokio::fs::read(path)
            .await
            .map_err(|e| CompressError::SourceUnreadable(format!("无法读取图片文件：{}", e)))?;
        validate_image_signature(&bytes)?;

        let source = SourceRef::new(path.to_string_lossy().to_string(), bytes.len() as u64);
        log::info!(
            "📁 已选择源图片 - 路径: {} 体积: {:.2}KB",
            source.path,
            source.original_size as f64 / 1024.0
        );
        Ok(source)
    }
}

/// 通过文件签名（magic bytes）校验输入是否为图片。
pub(crate) fn validate_image_signature(bytes: &[u8]) -> Result<(), CompressError> {
    if bytes.is_empty() {
        return Err(CompressError::InvalidFormat("图片内容为空".to_string()));
    }

    let kind = infer::get(bytes)
        .ok_or_else(|| CompressError::InvalidFormat("无法识别图片类型".to_string()))?;

    if kind.matcher_type() != infer::MatcherType::Image {
        return Err(CompressError::InvalidFormat(format!(
            "文件签名不是图片类型：{}",
            kind.mime_type()
        )));
    }

    Ok(())
}

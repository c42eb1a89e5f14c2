//! # 配置模块
//!
//! ## 设计思路
//!
//! 将重压缩面板的所有“可调策略”集中到 `CompressConfig`，保证运行时行为可观测、可调整、可测试。
//!
//! ## 实现思路
//!
//! - `Default` 提供生产可用的配置（防抖 500ms、50MB 文件上限）。
//! - `apply_settings` 从应用设置 JSON 中读取 `compress` 节点覆盖默认值，
//!   越界值夹取，未知字段忽略，保证坏配置不会让面板不可用。

use std::time::Duration;

/// 设置 JSON 中重压缩配置所在的键。
pub const SETTINGS_KEY: &str = "compress";

const DEBOUNCE_MS_RANGE: (u64, u64) = (50, 5_000);
const MAX_FILE_SIZE_MB_RANGE: (u64, u64) = (1, 512);
const MAX_DECODED_PIXELS_RANGE: (u64, u64) = (1_000_000, 400_000_000);

/// 图片重压缩配置。
#[derive(Debug, Clone, PartialEq)]
pub struct CompressConfig {
    /// 参数变化的防抖窗口（毫秒）。窗口内的连续变化只提交最后一次。
    pub debounce_ms: u64,
    /// 源图片允许的最大文件体积（字节）。
    pub max_file_size: u64,
    /// 解码前按图片头校验的像素上限（`width * height`）。
    pub max_decoded_pixels: u64,
    /// 结果句柄使用的 URI scheme（由桌面外壳注册）。
    pub result_scheme: String,
}

impl Default for CompressConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
            max_file_size: 50 * 1024 * 1024,
            max_decoded_pixels: 40_000_000,
            result_scheme: "toolbox".to_string(),
        }
    }
}

impl CompressConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// 用应用设置文档覆盖当前配置。
    ///
    /// 期望形如：
    /// ```json
    /// { "compress": { "debounceMs": 300, "maxFileSizeMb": 80, "maxDecodedPixels": 60000000 } }
    /// ```
    pub fn apply_settings(&mut self, settings: &serde_json::Value) {
        let Some(section) = settings.get(SETTINGS_KEY) else {
            return;
        };

        if let Some(ms) = section.get("debounceMs").and_then(|v| v.as_u64()) {
            self.debounce_ms = ms.clamp(DEBOUNCE_MS_RANGE.0, DEBOUNCE_MS_RANGE.1);
        }

        if let Some(mb) = section.get("maxFileSizeMb").and_then(|v| v.as_u64()) {
            self.max_file_size =
                mb.clamp(MAX_FILE_SIZE_MB_RANGE.0, MAX_FILE_SIZE_MB_RANGE.1) * 1024 * 1024;
        }

        if let Some(pixels) = section.get("maxDecodedPixels").and_then(|v| v.as_u64()) {
            self.max_decoded_pixels =
                pixels.clamp(MAX_DECODED_PIXELS_RANGE.0, MAX_DECODED_PIXELS_RANGE.1);
        }

        log::info!(
            "⚙️ 已应用重压缩配置：debounce={}ms max_file={}MB max_pixels={}",
            self.debounce_ms,
            self.max_file_size / 1024 / 1024,
            self.max_decoded_pixels
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn settings_override_known_fields() {
        let mut config = CompressConfig::default();
        config.apply_settings(&json!({
            "compress": { "debounceMs": 300, "maxFileSizeMb": 80 }
        }));

        assert_eq!(config.debounce_ms, 300);
        assert_eq!(config.max_file_size, 80 * 1024 * 1024);
        assert_eq!(config.max_decoded_pixels, 40_000_000);
    }

    #[test]
    fn settings_clamp_out_of_range_values() {
        let mut config = CompressConfig::default();
        config.apply_settings(&json!({
            "compress": { "debounceMs": 1, "maxFileSizeMb": 100000, "maxDecodedPixels": 5 }
        }));

        assert_eq!(config.debounce_ms, 50);
        assert_eq!(config.max_file_size, 512 * 1024 * 1024);
        assert_eq!(config.max_decoded_pixels, 1_000_000);
    }

    #[test]
    fn settings_without_section_keep_defaults() {
        let mut config = CompressConfig::default();
        config.apply_settings(&json!({ "theme": "dark", "compress": null }));
        assert_eq!(config, CompressConfig::default());
    }
}

//! # 错误模型模块
//!
//! ## 设计思路
//!
//! 使用单一错误枚举承载重压缩链路中的所有错误来源，避免字符串拼接式错误处理。
//! 通过 `thiserror` 保持人类可读错误，同时让调用侧可按分支匹配。
//! `code()` / `stage()` 提供稳定标识，供前端区分失败阶段。

/// 图片重压缩统一错误类型。
///
/// 该类型会在命令层被上转为 `AppError` 或 `CompressCommandError`，最终透传给前端。
#[derive(Debug, thiserror::Error)]
pub enum CompressError {
    #[error("源图片不可读：{0}")]
    SourceUnreadable(String),

    #[error("格式错误：{0}")]
    InvalidFormat(String),

    #[error("资源限制：{0}")]
    ResourceLimit(String),

    #[error("解码错误：{0}")]
    Decode(String),

    #[error("编码错误：{0}")]
    Encode(String),

    #[error("导出失败：{0}")]
    Export(String),

    #[error("面板状态错误：{0}")]
    Panel(String),
}

impl CompressError {
    /// 稳定错误码（前端按此分支处理）。
    pub fn code(&self) -> &'static str {
        match self {
            Self::SourceUnreadable(_) => "E_SOURCE",
            Self::InvalidFormat(_) => "E_FORMAT",
            Self::ResourceLimit(_) => "E_LIMIT",
            Self::Decode(_) => "E_DECODE",
            Self::Encode(_) => "E_ENCODE",
            Self::Export(_) => "E_EXPORT",
            Self::Panel(_) => "E_PANEL",
        }
    }

    /// 出错阶段。
    pub fn stage(&self) -> &'static str {
        match self {
            Self::SourceUnreadable(_) | Self::InvalidFormat(_) | Self::ResourceLimit(_) => "load",
            Self::Decode(_) => "decode",
            Self::Encode(_) => "encode",
            Self::Export(_) => "export",
            Self::Panel(_) => "panel",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable_per_variant() {
        assert_eq!(CompressError::Encode("x".into()).code(), "E_ENCODE");
        assert_eq!(CompressError::Export("x".into()).stage(), "export");
        assert_eq!(CompressError::ResourceLimit("x".into()).stage(), "load");
    }
}

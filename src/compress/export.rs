//! # 结果导出
//!
//! 导出是重压缩面板唯一面向用户报错的路径：
//! - 没有存活结果：空操作
//! - 用户取消保存对话框：不是错误
//! - 写入失败：返回 `CompressError::Export`，由命令层展示给用户

use std::path::PathBuf;

use serde::Serialize;

use super::resource::ResultSnapshot;
use super::{CompressError, CompressParams, FileDialogs};

/// 导出结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "path", rename_all = "camelCase")]
pub enum ExportOutcome {
    Written(PathBuf),
    Cancelled,
    NothingToExport,
}

/// 保存对话框的默认文件名：`compressed.<质量>.<扩展名>`。
pub fn default_file_name(params: &CompressParams) -> String {
    format!("compressed.{}.{}", params.quality, params.format.extension())
}

/// 将当前结果字节原样写入用户选择的位置。
pub async fn export_result(
    result: Option<&ResultSnapshot>,
    dialogs: &dyn FileDialogs,
) -> Result<ExportOutcome, CompressError> {
    let Some(result) = result else {
        log::debug!("没有可导出的结果");
        return Ok(ExportOutcome::NothingToExport);
    };

    let default_name = default_file_name(&result.params);
    let Some(destination) = dialogs
        .pick_destination(&default_name, result.params.format.extension())
        .await
    else {
        log::debug!("导出已取消");
        return Ok(ExportOutcome::Cancelled);
    };

    tokio::fs::write(&destination, &result.bytes[..])
        .await
        .map_err(|e| {
            CompressError::Export(format!("写入 {} 失败：{}", destination.display(), e))
        })?;

    log::info!(
        "💾 已导出重压缩结果 - 路径: {} 体积: {:.2}KB",
        destination.display(),
        result.bytes.len() as f64 / 1024.0
    );
    Ok(ExportOutcome::Written(destination))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compress::ImageFormat;
    use crate::compress::resource::DisplayHandle;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::Mutex;

    struct SaveTo {
        destination: Option<PathBuf>,
        requested: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl FileDialogs for SaveTo {
        async fn pick_image(&self) -> Option<PathBuf> {
            None
        }

        async fn pick_destination(&self, default_name: &str, extension: &str) -> Option<PathBuf> {
            self.requested
                .lock()
                .expect("lock")
                .push((default_name.to_string(), extension.to_string()));
            self.destination.clone()
        }
    }

    fn result(bytes: &'static [u8], params: CompressParams) -> ResultSnapshot {
        ResultSnapshot {
            bytes: Bytes::from_static(bytes),
            params,
            handle: DisplayHandle {
                id: 1,
                url: "test://1".to_string(),
                mime: params.format.mime_type(),
            },
        }
    }

    #[test]
    fn default_name_encodes_quality_and_format() {
        assert_eq!(
            default_file_name(&CompressParams::new(42, ImageFormat::Webp)),
            "compressed.42.webp"
        );
        assert_eq!(
            default_file_name(&CompressParams::new(100, ImageFormat::Jpeg)),
            "compressed.100.jpeg"
        );
    }

    #[tokio::test]
    async fn export_writes_bytes_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let destination = dir.path().join("out.png");
        let dialogs = SaveTo {
            destination: Some(destination.clone()),
            requested: Mutex::new(Vec::new()),
        };
        let payload: &'static [u8] = b"\x89PNG\r\n\x1a\nrest-of-the-bytes";

        let outcome = export_result(Some(&result(payload, CompressParams::new(60, ImageFormat::Png))), &dialogs)
            .await
            .expect("export should succeed");

        assert_eq!(outcome, ExportOutcome::Written(destination.clone()));
        assert_eq!(std::fs::read(&destination).expect("read back"), payload);
        assert_eq!(
            dialogs.requested.lock().expect("lock").as_slice(),
            &[("compressed.60.png".to_string(), "png".to_string())]
        );
    }

    #[tokio::test]
    async fn export_without_result_does_not_open_dialog() {
        let dialogs = SaveTo {
            destination: None,
            requested: Mutex::new(Vec::new()),
        };
        let outcome = export_result(None, &dialogs).await.expect("no-op");
        assert_eq!(outcome, ExportOutcome::NothingToExport);
        assert!(dialogs.requested.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn cancelled_dialog_is_not_an_error() {
        let dialogs = SaveTo {
            destination: None,
            requested: Mutex::new(Vec::new()),
        };
        let outcome = export_result(Some(&result(b"x", CompressParams::default())), &dialogs)
            .await
            .expect("cancel is not an error");
        assert_eq!(outcome, ExportOutcome::Cancelled);
    }

    #[tokio::test]
    async fn write_failure_is_surfaced() {
        let dir = tempfile::tempdir().expect("tempdir");
        let dialogs = SaveTo {
            destination: Some(dir.path().join("missing-dir").join("out.jpeg")),
            requested: Mutex::new(Vec::new()),
        };
        let outcome = export_result(Some(&result(b"x", CompressParams::default())), &dialogs).await;
        assert!(matches!(outcome, Err(CompressError::Export(_))));
    }
}

//! 基于 `tauri-plugin-dialog` 的文件对话框实现。
//!
//! 插件的对话框以回调形式返回，这里用 oneshot 通道转成 `async`。

use std::path::PathBuf;

use async_trait::async_trait;
use tauri::{AppHandle, Wry};
use tauri_plugin_dialog::{DialogExt, FilePath, MessageDialogKind};
use tokio::sync::oneshot;

use super::{CompressError, FileDialogs};

pub struct TauriDialogs {
    app: AppHandle<Wry>,
}

impl TauriDialogs {
    pub fn new(app: AppHandle<Wry>) -> Self {
        Self { app }
    }

    /// 向用户展示错误消息（仅用于导出失败）。
    pub fn show_error(&self, error: &CompressError) {
        self.app
            .dialog()
            .message(error.to_string())
            .title("导出失败")
            .kind(MessageDialogKind::Error)
            .show(|_| {});
    }
}

fn into_path(file: Option<FilePath>) -> Option<PathBuf> {
    match file?.into_path() {
        Ok(path) => Some(path),
        Err(err) => {
            log::warn!("对话框返回了无法识别的路径: {err}");
            None
        }
    }
}

#[async_trait]
impl FileDialogs for TauriDialogs {
    async fn pick_image(&self) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .file()
            .set_title("选择图片")
            .pick_file(move |file| {
                let _ = tx.send(into_path(file));
            });
        rx.await.ok().flatten()
    }

    async fn pick_destination(&self, default_name: &str, extension: &str) -> Option<PathBuf> {
        let (tx, rx) = oneshot::channel();
        self.app
            .dialog()
            .file()
            .set_file_name(default_name)
            .add_filter("images", &[extension])
            .save_file(move |file| {
                let _ = tx.send(into_path(file));
            });
        rx.await.ok().flatten()
    }
}


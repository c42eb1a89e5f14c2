//! # Tauri 命令层
//!
//! ## 设计思路
//!
//! 命令层仅做 IPC 参数接收与结果返回，不承载业务逻辑。
//! 所有实际处理交由 `CompressServiceState`，保持命令函数薄、稳定、易测试。

use tauri::ipc::Response;
use tauri::{AppHandle, Emitter, State, Wry};

use super::dialog::TauriDialogs;
use super::export::ExportOutcome;
use super::{CompressError, CompressParams, EncodeBridge, ImageFormat, PanelSnapshot, service};

/// 面板状态事件名：每次快照变化都会推送。
pub const PANEL_STATE_EVENT: &str = "compress-panel-state";

#[derive(Debug, Clone, serde::Serialize)]
pub struct CompressCommandError {
    pub code: &'static str,
    pub stage: &'static str,
    pub message: String,
}

impl From<CompressError> for CompressCommandError {
    fn from(error: CompressError) -> Self {
        Self {
            code: error.code(),
            stage: error.stage(),
            message: error.to_string(),
        }
    }
}

/// 把源图片重压缩为目标格式，直接返回二进制字节。
#[tauri::command]
pub async fn compress_images_to_buffer(
    state: State<'_, service::CompressServiceState>,
    image_path: String,
    quality: i64,
    format: String,
) -> Result<Response, CompressCommandError> {
    let format: ImageFormat = format.parse()?;
    let bytes = state
        .bridge()
        .encode(&image_path, CompressParams::new(quality, format))
        .await?;
    Ok(Response::new(bytes))
}

/// 打开面板，并把后续快照转发为 `compress-panel-state` 事件。
#[tauri::command]
pub async fn open_compress_panel(
    state: State<'_, service::CompressServiceState>,
    app: AppHandle<Wry>,
) -> Result<PanelSnapshot, CompressCommandError> {
    let mut receiver = state.open_panel()?;
    let initial = receiver.borrow_and_update().clone();

    tauri::async_runtime::spawn(async move {
        // 面板关闭或被替换时发送端销毁，循环随之结束
        while receiver.changed().await.is_ok() {
            let snapshot = receiver.borrow_and_update().clone();
            if let Err(err) = app.emit(PANEL_STATE_EVENT, &snapshot) {
                log::warn!("推送面板状态失败: {err}");
            }
        }
        log::debug!("面板状态转发已结束");
    });

    Ok(initial)
}

#[tauri::command]
pub fn close_compress_panel(
    state: State<'_, service::CompressServiceState>,
) -> Result<(), CompressCommandError> {
    state.close_panel()?;
    Ok(())
}

/// 弹出文件选择框。取消或文件不可用时返回 `None`。
#[tauri::command]
pub async fn select_compress_source(
    state: State<'_, service::CompressServiceState>,
    app: AppHandle<Wry>,
) -> Result<Option<PanelSnapshot>, CompressCommandError> {
    let dialogs = TauriDialogs::new(app);
    Ok(state.select_source(&dialogs).await?)
}

#[tauri::command]
pub fn set_compress_quality(
    state: State<'_, service::CompressServiceState>,
    quality: i64,
) -> Result<PanelSnapshot, CompressCommandError> {
    Ok(state.set_quality(quality)?)
}

#[tauri::command]
pub fn set_compress_format(
    state: State<'_, service::CompressServiceState>,
    format: String,
) -> Result<PanelSnapshot, CompressCommandError> {
    let format: ImageFormat = format.parse()?;
    Ok(state.set_format(format)?)
}

#[tauri::command]
pub fn get_compress_panel_state(
    state: State<'_, service::CompressServiceState>,
) -> Result<PanelSnapshot, CompressCommandError> {
    Ok(state.snapshot()?)
}

/// 导出当前结果。写入失败会弹出错误提示并返回错误。
#[tauri::command]
pub async fn export_compressed_image(
    state: State<'_, service::CompressServiceState>,
    app: AppHandle<Wry>,
) -> Result<ExportOutcome, CompressCommandError> {
    let dialogs = TauriDialogs::new(app);
    match state.export(&dialogs).await {
        Ok(outcome) => Ok(outcome),
        Err(err) => {
            log::error!("❌ 导出失败: {err}");
            dialogs.show_error(&err);
            Err(err.into())
        }
    }
}

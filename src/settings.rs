//! 应用设置（`settings.json`）的读写。
//!
//! 文件读写与解析不依赖 Tauri，命令只负责定位应用数据目录并应用运行时配置。

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::AppError;

pub const SETTINGS_FILE_NAME: &str = "settings.json";

/// 读取设置文件。文件不存在时返回 `None`。
pub fn read_settings(path: &Path) -> Result<Option<serde_json::Value>, AppError> {
    if !path.exists() {
        return Ok(None);
    }

    let content = fs::read_to_string(path)?;
    let parsed = serde_json::from_str::<serde_json::Value>(&content)
        .map_err(|e| AppError::Storage(format!("解析设置文件失败: {}", e)))?;

    Ok(Some(parsed))
}

pub fn write_settings(path: &Path, settings: &serde_json::Value) -> Result<(), AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| AppError::Storage(format!("创建应用数据目录失败: {}", e)))?;
    }

    let content = serde_json::to_string_pretty(settings)
        .map_err(|e| AppError::Storage(format!("序列化设置失败: {}", e)))?;

    fs::write(path, content)?;
    Ok(())
}

pub fn settings_file_in(dir: &Path) -> PathBuf {
    dir.join(SETTINGS_FILE_NAME)
}

#[cfg(feature = "desktop")]
pub fn settings_file_path(app: &tauri::AppHandle) -> Result<PathBuf, AppError> {
    use tauri::Manager;

    let app_data_dir = app
        .path()
        .app_data_dir()
        .map_err(|e| AppError::Storage(format!("获取应用数据目录失败: {}", e)))?;

    Ok(settings_file_in(&app_data_dir))
}

#[cfg(feature = "desktop")]
#[tauri::command]
pub fn get_app_settings(app: tauri::AppHandle) -> Result<Option<serde_json::Value>, AppError> {
    read_settings(&settings_file_path(&app)?)
}

/// 保存设置并立即应用到重压缩服务的运行时配置。
#[cfg(feature = "desktop")]
#[tauri::command]
pub fn set_app_settings(
    app: tauri::AppHandle,
    state: tauri::State<'_, crate::compress::CompressServiceState>,
    settings: serde_json::Value,
) -> Result<(), AppError> {
    let settings_path = settings_file_path(&app)?;

    state.apply_settings(&settings)?;

    write_settings(&settings_path, &settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let settings = read_settings(&settings_file_in(dir.path())).expect("read");
        assert!(settings.is_none());
    }

    #[test]
    fn written_settings_read_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_file_in(&dir.path().join("nested"));
        let value = serde_json::json!({ "compress": { "debounceMs": 300 }, "theme": "dark" });

        write_settings(&path, &value).expect("write");
        assert_eq!(read_settings(&path).expect("read"), Some(value));
    }

    #[test]
    fn corrupt_file_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = settings_file_in(dir.path());
        fs::write(&path, "{ not json").expect("write");

        assert!(matches!(read_settings(&path), Err(AppError::Storage(_))));
    }
}

// 防止在 Windows 发布版本中显示额外的控制台窗口，不要删除！
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

//! # 开发者工具箱 — 应用入口
//!
//! 本文件仅负责应用初始化与插件/命令注册。
//! 业务逻辑分布在各子模块中，详见 `lib.rs` 架构文档。

use dev_toolbox::compress::{self, CompressServiceState};
use dev_toolbox::settings;
use tauri::Manager;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    tauri::Builder::default()
        // 插件初始化
        .plugin(tauri_plugin_dialog::init())
        .plugin(tauri_plugin_fs::init())
        // 结果句柄协议：toolbox://localhost/<id>
        .register_uri_scheme_protocol("toolbox", |ctx, request| {
            let state = ctx.app_handle().state::<CompressServiceState>();
            compress::protocol::respond(state.registry(), &request)
        })
        // 应用设置
        .setup(|app| {
            log::info!("setup: begin");

            let service = CompressServiceState::new();
            match settings::settings_file_path(app.handle()).and_then(|path| settings::read_settings(&path)) {
                Ok(Some(saved)) => {
                    if let Err(err) = service.apply_settings(&saved) {
                        log::warn!("setup: 应用已保存的设置失败: {err}");
                    }
                }
                Ok(None) => log::info!("setup: 未找到设置文件，使用默认配置"),
                Err(err) => log::warn!("setup: 读取设置文件失败，使用默认配置: {err}"),
            }

            app.manage(service);
            log::info!("setup: compress service managed");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            compress::commands::compress_images_to_buffer,
            compress::commands::open_compress_panel,
            compress::commands::close_compress_panel,
            compress::commands::select_compress_source,
            compress::commands::set_compress_quality,
            compress::commands::set_compress_format,
            compress::commands::get_compress_panel_state,
            compress::commands::export_compressed_image,
            settings::get_app_settings,
            settings::set_app_settings,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}

//! # 开发者工具箱 — 库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  前端 (React + TypeScript)                │
//! │                                                          │
//! │  ImagePanel ── 质量滑块 / 格式下拉 / 对比视图 / 导出      │
//! │       ↕  invoke + compress-panel-state 事件              │
//! └───────┼──────────────────────────────────────────────────┘
//!         ↕ Tauri IPC                ↕ toolbox://localhost/<id>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕            后端 (Rust)                           │
//! │                                                          │
//! │  ┌─ error ────── AppError (统一错误类型)                  │
//! │  │                                                       │
//! │  ├─ compress ─── 重压缩面板                              │
//! │  │   ├─ controller  防抖 + epoch 门控状态机               │
//! │  │   ├─ bridge      读取·解码·编码 (image)                │
//! │  │   ├─ resource    展示句柄 RAII                         │
//! │  │   └─ export      结果导出                             │
//! │  │                                                       │
//! │  └─ settings ─── settings.json 读写                      │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`error`] | 统一错误类型 `AppError`，应用级 Tauri command 的返回类型 |
//! | [`compress`] | 图片重压缩面板：源选择、防抖请求、结果句柄、导出 |
//! | [`settings`] | 应用设置文件读写，并同步到运行时配置 |
//!
//! 桌面外壳（Tauri 命令、对话框、URI 协议）位于 `desktop` 特性之后，
//! 核心逻辑可在无界面环境下构建与测试。

pub mod error;
pub mod compress;
pub mod settings;

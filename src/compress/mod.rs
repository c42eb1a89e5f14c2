//! # 图片重压缩模块（compress）
//!
//! ## 设计思路
//!
//! 面板让用户选一张本地图片，调整质量与目标格式，实时预览重压缩结果并导出。
//! 核心是一个显式状态机（`RequestController`）：
//!
//! - 输入变化先经过防抖，静默期结束后最多发出一次编码请求
//! - 每次请求携带单调递增的 epoch，只有最新 epoch 的响应会被采纳
//! - 编码结果以可撤销的展示句柄交给界面，任一时刻最多存活一个
//!
//! 按职责拆分：
//!
//! - `commands`：仅做 IPC 入参/出参适配（薄封装，`desktop` 特性）
//! - `service`：承载可注入状态（`CompressServiceState`）
//! - `controller`：防抖 + epoch 门控的请求状态机
//! - `bridge`：编码桥接口与基于 `image` 的本地实现
//! - `resource`：展示句柄的创建 / 撤销与 RAII 租约
//! - `source`：文件选择与源图片校验
//! - `export`：结果导出到磁盘
//! - `config/error/params`：配置、错误、参数模型
//!
//! ## 新同事快速上手
//!
//! ```text
//! 前端 invoke / 面板事件
//!    ↓
//! commands.rs（参数适配，推送 compress-panel-state）
//!    ↓
//! service.rs（State 注入、面板生命周期）
//!    ↓
//! controller.rs（防抖 → epoch → 派发）
//!    ├─ bridge.rs（读文件 + 像素限制 + 解码 + 编码）
//!    └─ resource.rs（安装新句柄，释放旧句柄）
//!    ↓
//! PanelSnapshot → 前端
//! ```

#[cfg(feature = "desktop")]
pub mod commands;
#[cfg(feature = "desktop")]
mod dialog;
#[cfg(feature = "desktop")]
pub mod protocol;

mod bridge;
mod config;
mod controller;
mod error;
mod export;
mod params;
mod resource;
pub mod service;
mod source;

pub use bridge::{EncodeBridge, NativeEncoder, encode_file, encode_image};
pub use config::{CompressConfig, SETTINGS_KEY};
pub use controller::{PanelInputs, PanelSnapshot, RequestController, RequestPhase, size_kib};
pub use error::CompressError;
pub use export::{ExportOutcome, default_file_name, export_result};
pub use params::{CompressParams, DEFAULT_QUALITY, ImageFormat, Quality};
pub use resource::{
    DisplayHandle, DisplayHandles, HandleLease, LiveResult, ObjectUrlRegistry, ResultSnapshot,
    ResultStore,
};
pub use service::CompressServiceState;
pub use source::{FileDialogs, SourceRef, SourceResolver, asset_url};


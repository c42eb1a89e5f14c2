//! # 服务层（可注入状态）
//!
//! ## 设计思路
//!
//! 使用 `CompressServiceState` 作为 Tauri 注入状态，替代全局单例。
//! 它持有编码桥、结果句柄表与配置，并管理“当前打开的面板”：
//! - `open_panel`：新建控制器（旧面板随之销毁并释放句柄）
//! - `close_panel`：销毁当前面板
//!
//! 服务本身不依赖 Tauri，测试可直接构造并注入替身编码桥。

use std::sync::{Arc, Mutex, RwLock};

use tokio::sync::watch;

use super::export::{ExportOutcome, export_result};
use super::{
    CompressConfig, CompressError, EncodeBridge, FileDialogs, ImageFormat, NativeEncoder,
    ObjectUrlRegistry, PanelSnapshot, RequestController, SourceResolver,
};

/// 图片重压缩服务状态。
pub struct CompressServiceState {
    config: Arc<RwLock<CompressConfig>>,
    bridge: Arc<dyn EncodeBridge>,
    registry: Arc<ObjectUrlRegistry>,
    panel: Mutex<Option<RequestController>>,
}

impl CompressServiceState {
    /// 使用默认配置与本地编码器创建服务。
    pub fn new() -> Self {
        Self::with_config(CompressConfig::default())
    }

    pub fn with_config(config: CompressConfig) -> Self {
        let config = Arc::new(RwLock::new(config));
        let bridge = Arc::new(NativeEncoder::new(Arc::clone(&config)));
        Self::with_bridge(config, bridge)
    }

    /// 注入自定义编码桥（测试或替换外部编码服务时使用）。
    pub fn with_bridge(config: Arc<RwLock<CompressConfig>>, bridge: Arc<dyn EncodeBridge>) -> Self {
        let scheme = config
            .read()
            .map(|cfg| cfg.result_scheme.clone())
            .unwrap_or_else(|_| CompressConfig::default().result_scheme);

        Self {
            config,
            bridge,
            registry: Arc::new(ObjectUrlRegistry::new(scheme)),
            panel: Mutex::new(None),
        }
    }

    pub fn registry(&self) -> &Arc<ObjectUrlRegistry> {
        &self.registry
    }

    pub fn bridge(&self) -> &Arc<dyn EncodeBridge> {
        &self.bridge
    }

    pub fn config_snapshot(&self) -> Result<CompressConfig, CompressError> {
        self.config
            .read()
            .map(|cfg| cfg.clone())
            .map_err(|_| CompressError::Panel("配置读取锁已中毒".to_string()))
    }

    /// 用设置文档覆盖运行时配置。对已打开面板的防抖窗口在下次打开时生效。
    pub fn apply_settings(&self, settings: &serde_json::Value) -> Result<(), CompressError> {
        let mut config = self
            .config
            .write()
            .map_err(|_| CompressError::Panel("配置写入锁已中毒".to_string()))?;
        config.apply_settings(settings);
        Ok(())
    }

    /// 打开（或重新打开）面板，返回快照订阅。
    ///
    /// 必须在 tokio 运行时内调用。
    pub fn open_panel(&self) -> Result<watch::Receiver<PanelSnapshot>, CompressError> {
        let config = self.config_snapshot()?;
        let controller = RequestController::new(
            Arc::clone(&self.bridge),
            self.registry.clone(),
            &config,
        );
        let receiver = controller.subscribe();

        let previous = self.lock_panel()?.replace(controller);
        drop(previous);

        log::info!("🪟 重压缩面板已打开");
        Ok(receiver)
    }

    pub fn close_panel(&self) -> Result<(), CompressError> {
        let previous = self.lock_panel()?.take();
        if let Some(controller) = previous {
            controller.teardown();
        }
        Ok(())
    }

    /// 选择源图片。取消或失败时返回 `Ok(None)`，面板状态不变。
    pub async fn select_source(&self, dialogs: &dyn FileDialogs) -> Result<Option<PanelSnapshot>, CompressError> {
        let resolver = SourceResolver::new(self.config_snapshot()?);
        let Some(source) = resolver.select(dialogs).await else {
            return Ok(None);
        };

        self.with_panel(|panel| {
            panel.select_source(source)?;
            Ok(Some(panel.snapshot()))
        })
    }

    pub fn set_quality(&self, quality: i64) -> Result<PanelSnapshot, CompressError> {
        self.with_panel(|panel| {
            panel.set_quality(quality)?;
            Ok(panel.snapshot())
        })
    }

    pub fn set_format(&self, format: ImageFormat) -> Result<PanelSnapshot, CompressError> {
        self.with_panel(|panel| {
            panel.set_format(format)?;
            Ok(panel.snapshot())
        })
    }

    pub fn snapshot(&self) -> Result<PanelSnapshot, CompressError> {
        self.with_panel(|panel| Ok(panel.snapshot()))
    }

    /// 导出当前结果。面板未打开时与“无结果”相同，为空操作。
    pub async fn export(&self, dialogs: &dyn FileDialogs) -> Result<ExportOutcome, CompressError> {
        let result = match self.lock_panel()?.as_ref() {
            Some(panel) => panel.current_result()?,
            None => None,
        };
        export_result(result.as_ref(), dialogs).await
    }

    fn lock_panel(&self) -> Result<std::sync::MutexGuard<'_, Option<RequestController>>, CompressError> {
        self.panel
            .lock()
            .map_err(|_| CompressError::Panel("面板锁已中毒".to_string()))
    }

    fn with_panel<T>(
        &self,
        f: impl FnOnce(&RequestController) -> Result<T, CompressError>,
    ) -> Result<T, CompressError> {
        let guard = self.lock_panel()?;
        let panel = guard
            .as_ref()
            .ok_or_else(|| CompressError::Panel("重压缩面板未打开".to_string()))?;
        f(panel)
    }
}

impl Default for CompressServiceState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn commands_require_an_open_panel() {
        let service = CompressServiceState::new();
        assert!(matches!(service.set_quality(10), Err(CompressError::Panel(_))));

        service.open_panel().expect("open");
        let snapshot = service.set_quality(150).expect("set quality");
        assert_eq!(snapshot.quality, 100);

        service.close_panel().expect("close");
        assert!(matches!(service.snapshot(), Err(CompressError::Panel(_))));
    }

    struct NoDialogs;

    #[async_trait::async_trait]
    impl FileDialogs for NoDialogs {
        async fn pick_image(&self) -> Option<std::path::PathBuf> {
            None
        }

        async fn pick_destination(&self, _default_name: &str, _extension: &str) -> Option<std::path::PathBuf> {
            panic!("save dialog must not open without a result");
        }
    }

    #[tokio::test]
    async fn export_with_closed_panel_is_a_no_op() {
        let service = CompressServiceState::new();
        let outcome = service.export(&NoDialogs).await.expect("closed panel is not an error");
        assert_eq!(outcome, ExportOutcome::NothingToExport);

        service.open_panel().expect("open");
        service.close_panel().expect("close");
        let outcome = service.export(&NoDialogs).await.expect("closed panel is not an error");
        assert_eq!(outcome, ExportOutcome::NothingToExport);
    }

    #[tokio::test]
    async fn settings_update_runtime_config() {
        let service = CompressServiceState::new();
        service
            .apply_settings(&serde_json::json!({ "compress": { "debounceMs": 250 } }))
            .expect("apply settings");
        assert_eq!(service.config_snapshot().expect("config").debounce_ms, 250);
    }
}

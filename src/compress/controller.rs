//! # 重压缩请求控制器
//!
//! ## 设计思路
//!
//! 显式状态机 + 单调递增的请求纪元（epoch）：
//!
//! ```text
//! Idle ──(输入稳定且与上次提交不同)──▶ Requesting ──▶ Applied
//!   ▲                                    │        └──▶ Failed
//!   └────────────(下一次输入变化)─────────┘
//! ```
//!
//! - 输入（源图片、质量、格式）经 `watch` 通道进入防抖驱动任务，
//!   窗口内的连续变化只提交最后一次取值。
//! - 每次提交在状态锁内 `epoch += 1` 并记录本地纪元；响应返回时
//!   只有本地纪元仍等于最新纪元才允许修改可见状态，否则静默丢弃。
//! - 编码调用本身不取消（开放问题，保留原行为），正确性完全依赖纪元比较。
//!
//! ## 实现思路
//!
//! 状态集中在一个 `std::sync::Mutex<ControllerState>` 中，锁内不跨 `.await`。
//! 每次状态变化都发布一份 `PanelSnapshot`，界面层订阅即可。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use bytes::Bytes;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::resource::{DisplayHandles, ResultSnapshot, ResultStore};
use super::{CompressConfig, CompressError, CompressParams, EncodeBridge, ImageFormat, SourceRef};

/// 请求状态机阶段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RequestPhase {
    Idle,
    Requesting,
    Applied,
    Failed,
}

/// 控制器观察的输入组合。
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PanelInputs {
    pub source: Option<SourceRef>,
    pub params: CompressParams,
}

/// 面板展示快照（对比视图所需的全部数据）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelSnapshot {
    pub phase: RequestPhase,
    pub loading: bool,
    pub epoch: u64,
    pub quality: u8,
    pub format: ImageFormat,
    pub source_url: Option<String>,
    pub result_url: Option<String>,
    pub original_size: u64,
    pub encoded_size: u64,
    /// 原始体积（KB，保留两位小数）。
    pub original_size_kib: String,
    /// 结果体积（KB，保留两位小数）。
    pub encoded_size_kib: String,
    /// 结果比原图更大（界面据此标红）。
    pub encoded_larger: bool,
}

/// 字节数转换为两位小数的 KB 字符串。
pub fn size_kib(bytes: u64) -> String {
    format!("{:.2}", bytes as f64 / 1024.0)
}

struct ControllerState {
    phase: RequestPhase,
    loading: bool,
    inputs: PanelInputs,
    last_issued: Option<PanelInputs>,
    store: ResultStore,
    torn_down: bool,
}

struct ControllerInner {
    bridge: Arc<dyn EncodeBridge>,
    debounce: Duration,
    epoch: AtomicU64,
    state: Mutex<ControllerState>,
    snapshot_tx: watch::Sender<PanelSnapshot>,
}

/// 重压缩请求控制器。
///
/// 构造时会在当前 tokio 运行时中启动防抖驱动任务。
pub struct RequestController {
    inner: Arc<ControllerInner>,
    inputs_tx: watch::Sender<PanelInputs>,
    driver: Mutex<Option<JoinHandle<()>>>,
}

impl RequestController {
    pub fn new(
        bridge: Arc<dyn EncodeBridge>,
        handles: Arc<dyn DisplayHandles>,
        config: &CompressConfig,
    ) -> Self {
        let inputs = PanelInputs::default();
        let state = ControllerState {
            phase: RequestPhase::Idle,
            loading: false,
            inputs: inputs.clone(),
            last_issued: None,
            store: ResultStore::new(handles),
            torn_down: false,
        };

        let (snapshot_tx, _) = watch::channel(build_snapshot(&state, 0));
        let inner = Arc::new(ControllerInner {
            bridge,
            debounce: config.debounce(),
            epoch: AtomicU64::new(0),
            state: Mutex::new(state),
            snapshot_tx,
        });

        let (inputs_tx, inputs_rx) = watch::channel(inputs);
        let driver = tokio::spawn(run_debounce_driver(Arc::clone(&inner), inputs_rx));

        Self {
            inner,
            inputs_tx,
            driver: Mutex::new(Some(driver)),
        }
    }

    /// 安装新的源图片。
    ///
    /// 旧结果立即释放，进行中的旧请求随之失效。重复选择同一源图片为空操作。
    pub fn select_source(&self, source: SourceRef) -> Result<(), CompressError> {
        let mut state = self.inner.lock_state()?;
        if state.torn_down {
            return Err(CompressError::Panel("面板已关闭".to_string()));
        }
        if state.inputs.source.as_ref() == Some(&source) {
            log::debug!("源图片未变化，保留当前结果：{}", source.path);
            return Ok(());
        }

        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        state.store.release();
        state.loading = false;
        state.phase = RequestPhase::Idle;
        state.last_issued = None;
        state.inputs.source = Some(source);
        self.inner.publish(&state);

        let inputs = state.inputs.clone();
        drop(state);
        self.inputs_tx.send_replace(inputs);
        Ok(())
    }

    /// 设置质量（越界夹取到 0–100）。
    pub fn set_quality(&self, quality: i64) -> Result<(), CompressError> {
        self.update_params(|params| params.quality = quality.into())
    }

    pub fn set_format(&self, format: ImageFormat) -> Result<(), CompressError> {
        self.update_params(|params| params.format = format)
    }

    fn update_params(&self, apply: impl FnOnce(&mut CompressParams)) -> Result<(), CompressError> {
        let mut state = self.inner.lock_state()?;
        if state.torn_down {
            return Err(CompressError::Panel("面板已关闭".to_string()));
        }

        apply(&mut state.inputs.params);
        self.inner.publish(&state);

        let inputs = state.inputs.clone();
        drop(state);
        self.inputs_tx.send_replace(inputs);
        Ok(())
    }

    pub fn snapshot(&self) -> PanelSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PanelSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// 当前存活结果（供导出使用）。
    pub fn current_result(&self) -> Result<Option<ResultSnapshot>, CompressError> {
        Ok(self.inner.lock_state()?.store.snapshot())
    }

    /// 销毁面板：停止防抖驱动、使进行中请求失效、释放存活句柄。
    ///
    /// 可重复调用；句柄只会释放一次。
    pub fn teardown(&self) {
        if let Ok(mut driver) = self.driver.lock() {
            if let Some(handle) = driver.take() {
                handle.abort();
            }
        }

        let mut state = match self.inner.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if state.torn_down {
            return;
        }

        state.torn_down = true;
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        let released = state.store.release();
        state.loading = false;
        state.phase = RequestPhase::Idle;
        self.inner.publish(&state);

        log::info!("🧹 重压缩面板已关闭（释放结果句柄：{}）", released);
    }
}

impl Drop for RequestController {
    fn drop(&mut self) {
        self.teardown();
    }
}

impl ControllerInner {
    fn lock_state(&self) -> Result<MutexGuard<'_, ControllerState>, CompressError> {
        self.state
            .lock()
            .map_err(|_| CompressError::Panel("面板状态锁已中毒".to_string()))
    }

    fn publish(&self, state: &ControllerState) {
        let snapshot = build_snapshot(state, self.epoch.load(Ordering::SeqCst));
        self.snapshot_tx.send_replace(snapshot);
    }

    /// 提交一次已稳定的输入。无源图片或与上次提交相同则忽略。
    fn submit(self: &Arc<Self>, inputs: PanelInputs) {
        let Some(source) = inputs.source.clone() else {
            return;
        };
        let params = inputs.params;

        let epoch = {
            let mut state = match self.lock_state() {
                Ok(state) => state,
                Err(err) => {
                    log::error!("提交重压缩请求失败：{}", err);
                    return;
                }
            };
            // 取值与加锁之间输入可能又变了，较新的取值已在通道中排队
            if state.torn_down || state.inputs != inputs || state.last_issued.as_ref() == Some(&inputs) {
                return;
            }

            let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
            state.last_issued = Some(inputs);
            state.phase = RequestPhase::Requesting;
            state.loading = true;
            self.publish(&state);
            epoch
        };

        log::debug!(
            "📤 发起重压缩请求 #{} - 路径: {} 质量: {} 格式: {}",
            epoch,
            source.path,
            params.quality,
            params.format
        );

        let inner = Arc::clone(self);
        tokio::spawn(async move {
            let start = Instant::now();
            let outcome = inner.bridge.encode(&source.path, params).await;
            log::debug!("重压缩请求 #{} 返回，耗时 {}ms", epoch, start.elapsed().as_millis());
            inner.complete(epoch, source, params, outcome);
        });
    }

    fn complete(
        &self,
        epoch: u64,
        source: SourceRef,
        params: CompressParams,
        outcome: Result<Vec<u8>, CompressError>,
    ) {
        let mut state = match self.lock_state() {
            Ok(state) => state,
            Err(err) => {
                log::error!("应用重压缩结果失败：{}", err);
                return;
            }
        };

        let latest = self.epoch.load(Ordering::SeqCst);
        if state.torn_down || epoch != latest {
            log::debug!("⏭️ 丢弃过期的重压缩响应 #{}（最新 #{}）", epoch, latest);
            return;
        }

        match outcome {
            Ok(bytes) => {
                let handle = state.store.install(Bytes::from(bytes), params, source);
                state.phase = RequestPhase::Applied;
                log::info!("🖼️ 已安装重压缩结果 #{} -> {}", epoch, handle.url);
            }
            Err(err) => {
                state.phase = RequestPhase::Failed;
                log::error!("重压缩失败 #{} [{}]：{}", epoch, err.code(), err);
            }
        }

        state.loading = false;
        self.publish(&state);
    }
}

fn build_snapshot(state: &ControllerState, epoch: u64) -> PanelSnapshot {
    let live = state.store.live();
    let original_size = state
        .inputs
        .source
        .as_ref()
        .map(|source| source.original_size)
        .unwrap_or(0);
    let encoded_size = live.map(|live| live.encoded_size()).unwrap_or(0);

    PanelSnapshot {
        phase: state.phase,
        loading: state.loading,
        epoch,
        quality: state.inputs.params.quality.get(),
        format: state.inputs.params.format,
        source_url: state.inputs.source.as_ref().map(|source| source.display_url.clone()),
        result_url: live.map(|live| live.handle().url.clone()),
        original_size,
        encoded_size,
        original_size_kib: size_kib(original_size),
        encoded_size_kib: size_kib(encoded_size),
        encoded_larger: encoded_size > original_size,
    }
}

/// 防抖驱动：等待输入变化，直到一个完整窗口内不再变化后提交最终取值。
async fn run_debounce_driver(inner: Arc<ControllerInner>, mut inputs_rx: watch::Receiver<PanelInputs>) {
    loop {
        if inputs_rx.changed().await.is_err() {
            return;
        }

        loop {
            match tokio::time::timeout(inner.debounce, inputs_rx.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return,
                Err(_) => break,
            }
        }

        let inputs = inputs_rx.borrow_and_update().clone();
        inner.submit(inputs);
    }
}

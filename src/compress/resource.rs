//! # 结果资源管理
//!
//! ## 设计思路
//!
//! 编码结果以“展示句柄”（可撤销的 URL）的形式交给界面。句柄必须：
//! - 同一时刻最多只有一个处于存活状态
//! - 被替换或面板销毁时释放，且每个句柄只释放一次
//!
//! 释放与 UI 框架生命周期解耦：`HandleLease` 采用 RAII，`Drop` 时撤销句柄，
//! 因此替换、手动释放、整个 `ResultStore` 被丢弃这三条路径都能保证回收。
//!
//! ## 实现思路
//!
//! - `DisplayHandles`：句柄的创建 / 撤销接口
//! - `ObjectUrlRegistry`：生产实现，内存表 + 自定义 URI scheme 对外提供字节
//! - `ResultStore`：唯一持有存活结果的地方，所有安装 / 释放都经由它

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use serde::Serialize;

use super::{CompressParams, SourceRef};

/// 展示句柄：指向一段二进制图片数据、可被撤销的不透明引用。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DisplayHandle {
    pub id: u64,
    pub url: String,
    pub mime: &'static str,
}

/// 展示句柄的创建与撤销。
pub trait DisplayHandles: Send + Sync {
    fn create(&self, bytes: Bytes, mime: &'static str) -> DisplayHandle;
    fn revoke(&self, handle: &DisplayHandle);
}

/// 内存中的对象 URL 表。
///
/// 桌面外壳把 `<scheme>://localhost/<id>` 请求转发到 [`ObjectUrlRegistry::resolve`]。
pub struct ObjectUrlRegistry {
    scheme: String,
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, (Bytes, &'static str)>>,
}

impl ObjectUrlRegistry {
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// 结果 URL 前缀。Windows / Android 上 WebView 通过 `http://<scheme>.localhost/` 访问自定义协议。
    pub fn url_prefix(&self) -> String {
        if cfg!(any(windows, target_os = "android")) {
            format!("http://{}.localhost/", self.scheme)
        } else {
            format!("{}://localhost/", self.scheme)
        }
    }

    /// 按 URL 路径（`/<id>` 或 `<id>`）查找句柄内容与 MIME 类型。
    pub fn resolve(&self, path: &str) -> Option<(Bytes, &'static str)> {
        let id = path.trim_start_matches('/').parse::<u64>().ok()?;
        let entries = self.entries.lock().ok()?;
        entries.get(&id).map(|(bytes, mime)| (bytes.clone(), *mime))
    }

    /// 当前存活的句柄数量。
    pub fn live_count(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }
}

impl DisplayHandles for ObjectUrlRegistry {
    fn create(&self, bytes: Bytes, mime: &'static str) -> DisplayHandle {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        match self.entries.lock() {
            Ok(mut entries) => {
                entries.insert(id, (bytes, mime));
            }
            Err(_) => log::error!("对象 URL 表锁已中毒，句柄 {} 将无法加载", id),
        }

        DisplayHandle {
            id,
            url: format!("{}{}", self.url_prefix(), id),
            mime,
        }
    }

    fn revoke(&self, handle: &DisplayHandle) {
        let removed = match self.entries.lock() {
            Ok(mut entries) => entries.remove(&handle.id).is_some(),
            Err(_) => false,
        };

        if removed {
            log::debug!("🗑️ 已撤销结果句柄 {}", handle.url);
        } else {
            log::warn!("撤销了不存在的结果句柄 {}", handle.url);
        }
    }
}

/// 句柄租约：离开作用域时撤销句柄，且只撤销一次。
pub struct HandleLease {
    handle: DisplayHandle,
    handles: Arc<dyn DisplayHandles>,
}

impl HandleLease {
    pub fn acquire(handles: Arc<dyn DisplayHandles>, bytes: Bytes, mime: &'static str) -> Self {
        let handle = handles.create(bytes, mime);
        Self { handle, handles }
    }

    pub fn handle(&self) -> &DisplayHandle {
        &self.handle
    }
}

impl Drop for HandleLease {
    fn drop(&mut self) {
        self.handles.revoke(&self.handle);
    }
}

/// 当前生效的重压缩结果。
pub struct LiveResult {
    lease: HandleLease,
    pub bytes: Bytes,
    pub params: CompressParams,
    pub source: SourceRef,
}

impl LiveResult {
    pub fn handle(&self) -> &DisplayHandle {
        self.lease.handle()
    }

    pub fn encoded_size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// 导出所需的结果快照（字节共享，不复制）。
#[derive(Debug, Clone)]
pub struct ResultSnapshot {
    pub bytes: Bytes,
    pub params: CompressParams,
    pub handle: DisplayHandle,
}

/// 结果资源管理器：唯一持有存活结果的地方。
pub struct ResultStore {
    handles: Arc<dyn DisplayHandles>,
    live: Option<LiveResult>,
}

impl ResultStore {
    pub fn new(handles: Arc<dyn DisplayHandles>) -> Self {
        Self { handles, live: None }
    }

    /// 安装新结果：先创建新句柄，再释放旧句柄。
    pub fn install(&mut self, bytes: Bytes, params: CompressParams, source: SourceRef) -> DisplayHandle {
        let lease = HandleLease::acquire(Arc::clone(&self.handles), bytes.clone(), params.format.mime_type());
        let handle = lease.handle().clone();

        let previous = self.live.replace(LiveResult {
            lease,
            bytes,
            params,
            source,
        });
        drop(previous);

        handle
    }

    /// 释放当前存活结果（无结果时为空操作）。返回是否确实释放了句柄。
    pub fn release(&mut self) -> bool {
        self.live.take().is_some()
    }

    pub fn live(&self) -> Option<&LiveResult> {
        self.live.as_ref()
    }

    pub fn snapshot(&self) -> Option<ResultSnapshot> {
        self.live.as_ref().map(|live| ResultSnapshot {
            bytes: live.bytes.clone(),
            params: live.params,
            handle: live.handle().clone(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// 记录创建 / 撤销次数的句柄表，用于校验“不泄漏、不重复释放”。
    #[derive(Default)]
    pub(crate) struct CountingHandles {
        next_id: AtomicU64,
        pub(crate) created: Mutex<Vec<u64>>,
        pub(crate) revoked: Mutex<Vec<u64>>,
    }

    impl CountingHandles {
        pub(crate) fn created_count(&self) -> usize {
            self.created.lock().expect("lock").len()
        }

        pub(crate) fn revoked_count(&self) -> usize {
            self.revoked.lock().expect("lock").len()
        }
    }

    impl DisplayHandles for CountingHandles {
        fn create(&self, _bytes: Bytes, mime: &'static str) -> DisplayHandle {
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.created.lock().expect("lock").push(id);
            DisplayHandle {
                id,
                url: format!("test://{}", id),
                mime,
            }
        }

        fn revoke(&self, handle: &DisplayHandle) {
            let mut revoked = self.revoked.lock().expect("lock");
            assert!(!revoked.contains(&handle.id), "handle {} revoked twice", handle.id);
            revoked.push(handle.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::CountingHandles;
    use super::*;
    use crate::compress::ImageFormat;
    use proptest::prelude::*;

    fn source() -> SourceRef {
        SourceRef::new("/tmp/a.png", 1024)
    }

    #[test]
    fn install_releases_previous_handle_exactly_once() {
        let counter = Arc::new(CountingHandles::default());
        let mut store = ResultStore::new(counter.clone());

        for i in 0..5u8 {
            store.install(Bytes::from(vec![i; 8]), CompressParams::default(), source());
            assert_eq!(counter.created_count(), i as usize + 1);
            assert_eq!(counter.revoked_count(), i as usize);
        }

        assert!(store.release());
        assert!(!store.release());
        assert_eq!(counter.revoked_count(), 5);
    }

    #[test]
    fn dropping_store_releases_live_handle() {
        let counter = Arc::new(CountingHandles::default());
        {
            let mut store = ResultStore::new(counter.clone());
            store.install(Bytes::from_static(b"abc"), CompressParams::default(), source());
        }
        assert_eq!(counter.created_count(), 1);
        assert_eq!(counter.revoked_count(), 1);
    }

    #[test]
    fn handle_mime_follows_format() {
        let registry = Arc::new(ObjectUrlRegistry::new("toolbox"));
        let mut store = ResultStore::new(registry.clone());

        let handle = store.install(
            Bytes::from_static(b"webp-bytes"),
            CompressParams::new(80, ImageFormat::Webp),
            source(),
        );
        assert_eq!(handle.mime, "image/webp");
        assert_eq!(handle.url, format!("{}{}", registry.url_prefix(), handle.id));

        let (bytes, mime) = registry.resolve(&format!("/{}", handle.id)).expect("handle should resolve");
        assert_eq!(&bytes[..], b"webp-bytes");
        assert_eq!(mime, "image/webp");
    }

    #[test]
    fn registry_forgets_revoked_handles() {
        let registry = Arc::new(ObjectUrlRegistry::new("toolbox"));
        let mut store = ResultStore::new(registry.clone());

        let first = store.install(Bytes::from_static(b"1"), CompressParams::default(), source());
        let second = store.install(Bytes::from_static(b"2"), CompressParams::default(), source());

        assert!(registry.resolve(&first.id.to_string()).is_none());
        assert!(registry.resolve(&second.id.to_string()).is_some());
        assert_eq!(registry.live_count(), 1);

        drop(store);
        assert_eq!(registry.live_count(), 0);
    }

    #[test]
    fn result_url_matches_platform_scheme_form() {
        let registry = ObjectUrlRegistry::new("toolbox");
        let expected = if cfg!(any(windows, target_os = "android")) {
            "http://toolbox.localhost/"
        } else {
            "toolbox://localhost/"
        };
        assert_eq!(registry.url_prefix(), expected);

        let handle = registry.create(Bytes::from_static(b"x"), "image/png");
        assert_eq!(handle.url, format!("{}{}", expected, handle.id));
        registry.revoke(&handle);
    }

    proptest! {
        #[test]
        fn installed_result_records_submitted_params(quality in 0i64..=100, format_idx in 0usize..3) {
            let format = ImageFormat::ALL[format_idx];
            let params = CompressParams::new(quality, format);
            let counter = Arc::new(CountingHandles::default());
            let mut store = ResultStore::new(counter.clone());

            store.install(Bytes::from_static(b"x"), params, source());

            let live = store.live().expect("result should be live");
            prop_assert_eq!(live.params, params);
            prop_assert_eq!(live.handle().mime, format.mime_type());
            prop_assert_eq!(counter.created_count() - counter.revoked_count(), 1);
        }
    }
}

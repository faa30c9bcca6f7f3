//! 遥测观察者
//!
//! 每个有效遥测帧到达时，接收线程调用已注册的观察者（最多一个）。
//! 观察者在接收线程上运行，应尽快返回；耗时处理请转发到 channel。
//!
//! # 使用示例
//!
//! ```rust
//! use hdrive_driver::hooks::ObserverSlot;
//! use hdrive_protocol::TelemetryFrame;
//! use crossbeam_channel::bounded;
//!
//! let (tx, rx) = bounded::<TelemetryFrame>(16);
//! let slot = ObserverSlot::new();
//! slot.set(move |frame: &TelemetryFrame| {
//!     let _ = tx.try_send(*frame);
//! });
//!
//! assert!(slot.notify(&TelemetryFrame::default()));
//! assert!(rx.try_recv().is_ok());
//! ```

use hdrive_protocol::TelemetryFrame;
use parking_lot::RwLock;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// 遥测帧回调 Trait
///
/// 闭包 `Fn(&TelemetryFrame) + Send + Sync` 自动实现本 trait。
pub trait TelemetryCallback: Send + Sync {
    /// 接收到有效遥测帧时调用
    fn on_frame(&self, frame: &TelemetryFrame);
}

impl<F> TelemetryCallback for F
where
    F: Fn(&TelemetryFrame) + Send + Sync,
{
    fn on_frame(&self, frame: &TelemetryFrame) {
        self(frame)
    }
}

/// 观察者槽位
///
/// 注册新观察者会替换旧的。通知时先在读锁内克隆 `Arc`，再在锁外调用回调，
/// 因此回调执行期间可以并发替换观察者。
#[derive(Default)]
pub struct ObserverSlot {
    callback: RwLock<Option<Arc<dyn TelemetryCallback>>>,
}

impl ObserverSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册观察者（替换已有的）
    pub fn set<F>(&self, callback: F)
    where
        F: TelemetryCallback + 'static,
    {
        self.set_arc(Arc::new(callback));
    }

    pub fn set_arc(&self, callback: Arc<dyn TelemetryCallback>) {
        *self.callback.write() = Some(callback);
    }

    /// 移除观察者
    pub fn clear(&self) {
        *self.callback.write() = None;
    }

    pub fn is_set(&self) -> bool {
        self.callback.read().is_some()
    }

    /// 通知观察者
    ///
    /// 回调 panic 会被捕获；返回 `false` 表示回调失败。未注册观察者时返回 `true`。
    pub fn notify(&self, frame: &TelemetryFrame) -> bool {
        let Some(callback) = self.callback.read().clone() else {
            return true;
        };
        catch_unwind(AssertUnwindSafe(|| callback.on_frame(frame))).is_ok()
    }
}

impl std::fmt::Debug for ObserverSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObserverSlot")
            .field("is_set", &self.is_set())
            .finish()
    }
}

//! UDP 遥测接收器
//!
//! 管理接收线程的生命周期：启动（绑定端口 + 派生线程）、停止（清除运行标志 +
//! 有界 join）。最新帧通过 ArcSwap 发布，读取方永远不会阻塞接收线程。

use crate::error::DriverError;
use crate::hooks::TelemetryCallback;
use crate::metrics::TelemetryMetricsSnapshot;
use crate::pipeline::{TelemetryContext, telemetry_loop};
use crate::state::TelemetryState;
use crossbeam_channel::{RecvTimeoutError, bounded};
use hdrive_net::{DatagramSource, UdpTelemetrySocket};
use hdrive_protocol::{TELEMETRY_FRAME_SIZE, TelemetryFrame};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{JoinHandle, spawn};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// 带超时的线程 join
trait JoinTimeout {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinOutcome>;
}

#[derive(Debug, PartialEq, Eq)]
enum JoinOutcome {
    TimedOut,
    Panicked,
}

impl<T: Send + 'static> JoinTimeout for JoinHandle<T> {
    fn join_timeout(self, timeout: Duration) -> Result<(), JoinOutcome> {
        if self.is_finished() {
            return self.join().map(|_| ()).map_err(|_| JoinOutcome::Panicked);
        }

        let (tx, rx) = bounded(1);
        // 看门狗线程代为 join；超时后它继续等待，进程退出时回收
        spawn(move || {
            let _ = tx.send(self.join().is_ok());
        });

        match rx.recv_timeout(timeout) {
            Ok(true) => Ok(()),
            Ok(false) | Err(RecvTimeoutError::Disconnected) => Err(JoinOutcome::Panicked),
            Err(RecvTimeoutError::Timeout) => Err(JoinOutcome::TimedOut),
        }
    }
}

/// 遥测接收配置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// 接收轮询间隔（socket 读超时），决定停止响应延迟
    pub poll_interval: Duration,
    /// 停止时等待线程退出的上限
    pub join_timeout: Duration,
    /// 接收缓冲区大小
    pub receive_buffer_len: usize,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            join_timeout: Duration::from_secs(2),
            receive_buffer_len: 4096,
        }
    }
}

struct Worker {
    handle: JoinHandle<()>,
    is_running: Arc<AtomicBool>,
    local_port: Option<u16>,
}

/// UDP 遥测接收器
///
/// # Example
///
/// ```rust,no_run
/// use hdrive_driver::{TelemetryConfig, TelemetryReceiver};
///
/// let receiver = TelemetryReceiver::new(TelemetryConfig::default());
/// receiver.start(1001)?;
/// if let Some(frame) = receiver.latest() {
///     println!("position = {}", frame.position);
/// }
/// receiver.stop();
/// # Ok::<(), hdrive_driver::DriverError>(())
/// ```
pub struct TelemetryReceiver {
    ctx: Arc<TelemetryContext>,
    config: TelemetryConfig,
    worker: Mutex<Option<Worker>>,
}

impl TelemetryReceiver {
    pub fn new(config: TelemetryConfig) -> Self {
        Self {
            ctx: Arc::new(TelemetryContext::new()),
            config,
            worker: Mutex::new(None),
        }
    }

    /// 绑定 `0.0.0.0:port` 并启动接收线程
    ///
    /// 已在运行时为空操作。
    ///
    /// # 错误
    /// - `DriverError::Bind`: 端口绑定失败
    pub fn start(&self, port: u16) -> Result<(), DriverError> {
        let mut worker = self.worker.lock();
        if Self::is_alive(&worker) {
            debug!("UDP telemetry receiver already running");
            return Ok(());
        }

        debug!("Starting UDP telemetry receiver on port {}", port);
        let socket = UdpTelemetrySocket::bind(port, self.config.poll_interval).map_err(|source| {
            error!("Failed to bind UDP telemetry socket on port {}: {}", port, source);
            DriverError::Bind { port, source }
        })?;
        let local_port = socket.local_addr().ok().map(|addr| addr.port());

        info!(
            "UDP telemetry receiver listening on 0.0.0.0:{} (expecting {}-byte packets)",
            local_port.unwrap_or(port),
            TELEMETRY_FRAME_SIZE
        );
        Self::reap(&mut worker);
        *worker = Some(self.spawn_worker(socket, local_port));
        Ok(())
    }

    /// 使用自定义数据报来源启动接收线程（测试或非 UDP 链路）
    pub fn start_with_source<S>(&self, source: S)
    where
        S: DatagramSource + 'static,
    {
        let mut worker = self.worker.lock();
        if Self::is_alive(&worker) {
            debug!("UDP telemetry receiver already running");
            return;
        }
        Self::reap(&mut worker);
        *worker = Some(self.spawn_worker(source, None));
    }

    fn spawn_worker<S>(&self, source: S, local_port: Option<u16>) -> Worker
    where
        S: DatagramSource + 'static,
    {
        // 每次启动使用新的运行标志，旧线程（若 join 超时）不会被重新唤醒
        let is_running = Arc::new(AtomicBool::new(true));
        let ctx = self.ctx.clone();
        let flag = is_running.clone();
        let poll_interval = self.config.poll_interval;
        let buffer_len = self.config.receive_buffer_len;

        let handle = spawn(move || {
            telemetry_loop(source, ctx, flag, poll_interval, buffer_len);
        });

        Worker {
            handle,
            is_running,
            local_port,
        }
    }

    fn is_alive(worker: &Option<Worker>) -> bool {
        worker.as_ref().is_some_and(|w| !w.handle.is_finished())
    }

    /// 回收已退出的线程
    fn reap(worker: &mut Option<Worker>) {
        if let Some(old) = worker.take()
            && old.handle.join().is_err()
        {
            warn!("Previous telemetry thread had panicked");
        }
    }

    /// 停止接收线程（幂等）
    ///
    /// 清除运行标志后最多等待 `join_timeout`；超时记录错误并放弃等待。
    pub fn stop(&self) {
        let Some(worker) = self.worker.lock().take() else {
            return;
        };

        worker.is_running.store(false, Ordering::Release);
        match worker.handle.join_timeout(self.config.join_timeout) {
            Ok(()) => debug!("UDP telemetry receiver stopped"),
            Err(JoinOutcome::TimedOut) => error!(
                "Telemetry thread did not stop within {:?}, detaching",
                self.config.join_timeout
            ),
            Err(JoinOutcome::Panicked) => error!("Telemetry thread panicked"),
        }
    }

    /// 最新遥测帧（无锁）
    pub fn latest(&self) -> Option<Arc<TelemetryFrame>> {
        self.ctx.latest.load_full()
    }

    /// 注册观察者（替换已有的）
    pub fn set_observer<F>(&self, callback: F)
    where
        F: TelemetryCallback + 'static,
    {
        self.ctx.observer.set(callback);
    }

    pub fn set_observer_arc(&self, callback: Arc<dyn TelemetryCallback>) {
        self.ctx.observer.set_arc(callback);
    }

    pub fn clear_observer(&self) {
        self.ctx.observer.clear();
    }

    pub fn is_running(&self) -> bool {
        Self::is_alive(&self.worker.lock())
    }

    pub fn state(&self) -> TelemetryState {
        if self.is_running() {
            TelemetryState::Running
        } else {
            TelemetryState::Stopped
        }
    }

    /// 实际绑定的本地端口（`start(0)` 时由系统分配）
    pub fn local_port(&self) -> Option<u16> {
        self.worker.lock().as_ref().and_then(|w| w.local_port)
    }

    pub fn metrics(&self) -> TelemetryMetricsSnapshot {
        self.ctx.metrics.snapshot()
    }

    pub fn config(&self) -> &TelemetryConfig {
        &self.config
    }
}

impl Default for TelemetryReceiver {
    fn default() -> Self {
        Self::new(TelemetryConfig::default())
    }
}

impl Drop for TelemetryReceiver {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for TelemetryReceiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelemetryReceiver")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

//! 遥测接收循环
//!
//! 在独立线程上运行，持续接收 UDP 数据报：
//! - 长度正确的数据报解析为 [`TelemetryFrame`]，原子替换"最新帧"，再通知观察者
//! - 长度错误的数据报被丢弃并计数
//! - 轮询超时只用于检查停止标志

use crate::hooks::ObserverSlot;
use crate::metrics::TelemetryMetrics;
use arc_swap::ArcSwapOption;
use hdrive_net::{DatagramSource, NetError};
use hdrive_protocol::{TELEMETRY_FRAME_SIZE, TelemetryFrame, decode_telemetry};
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, error, info, trace, warn};

/// 连续超时多少次输出一次"尚未收到数据"提示
const IDLE_HINT_EVERY: u64 = 10;
/// 每收到多少帧输出一次调试日志
const PACKET_LOG_EVERY: u64 = 1000;

/// 接收线程与调用方共享的遥测上下文
#[derive(Debug, Default)]
pub struct TelemetryContext {
    /// 最新遥测帧（无锁读取）
    pub latest: ArcSwapOption<TelemetryFrame>,
    /// 观察者
    pub observer: ObserverSlot,
    /// 链路指标
    pub metrics: TelemetryMetrics,
}

impl TelemetryContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 遥测接收循环
///
/// # 参数
/// - `source`: 数据报来源（UDP socket 或测试注入）
/// - `ctx`: 共享上下文
/// - `is_running`: 运行标志，置为 `false` 后循环在下一次轮询时退出
/// - `poll_interval`: 轮询间隔（仅用于日志中的等待时长）
/// - `buffer_len`: 接收缓冲区大小（必须大于一帧，才能识别超长数据报）
pub fn telemetry_loop<S: DatagramSource>(
    mut source: S,
    ctx: Arc<TelemetryContext>,
    is_running: Arc<AtomicBool>,
    poll_interval: Duration,
    buffer_len: usize,
) {
    let mut buf = vec![0u8; buffer_len.max(TELEMETRY_FRAME_SIZE + 1)];
    let mut idle_polls: u64 = 0;

    loop {
        if !is_running.load(Ordering::Acquire) {
            trace!("Telemetry loop: stop requested, exiting");
            break;
        }

        let (len, from) = match source.receive(&mut buf) {
            Ok(received) => received,
            Err(NetError::Timeout) => {
                ctx.metrics.receive_timeouts.fetch_add(1, Ordering::Relaxed);
                idle_polls += 1;
                if idle_polls % IDLE_HINT_EVERY == 0 {
                    let waited = poll_interval.as_secs_f64() * idle_polls as f64;
                    debug!(
                        "No UDP packets received yet (waited {:.1}s). Check that the drive's UDP target IP matches this host.",
                        waited
                    );
                }
                continue;
            },
            Err(NetError::Io(e)) if is_transient(&e) => {
                ctx.metrics.socket_errors.fetch_add(1, Ordering::Relaxed);
                trace!("Telemetry loop: transient socket error: {}", e);
                continue;
            },
            Err(e) => {
                ctx.metrics.socket_errors.fetch_add(1, Ordering::Relaxed);
                error!("Telemetry loop: receive failed, stopping: {}", e);
                break;
            },
        };
        idle_polls = 0;

        let frame = match decode_telemetry(&buf[..len]) {
            Ok(frame) => frame,
            Err(e) => {
                let dropped = ctx.metrics.packets_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    "Dropped UDP packet from {}: {} (total dropped: {})",
                    from, e, dropped
                );
                continue;
            },
        };

        let received = ctx.metrics.packets_received.fetch_add(1, Ordering::Relaxed) + 1;
        if received == 1 {
            info!("First UDP telemetry packet received from {}", from);
        } else if received % PACKET_LOG_EVERY == 0 {
            debug!("Received {} UDP telemetry packets", received);
        }

        ctx.latest.store(Some(Arc::new(frame)));

        if !ctx.observer.notify(&frame) {
            let failures = ctx.metrics.observer_failures.fetch_add(1, Ordering::Relaxed) + 1;
            warn!("Telemetry observer panicked (total failures: {})", failures);
        }
    }
}

/// 不应终止接收循环的 socket 错误
///
/// 对端端口不可达时，部分平台会在下一次 `recv_from` 上报 ICMP 错误。
fn is_transient(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionRefused | io::ErrorKind::Interrupted
    )
}

//! 性能指标模块
//!
//! 零开销的原子计数器，用于监控命令通道与遥测链路的健康状态。
//! 所有计数器都使用原子操作，可以在任何线程读取，不会引入锁竞争。
//!
//! ```rust
//! use hdrive_driver::metrics::TelemetryMetrics;
//! use std::sync::atomic::Ordering;
//!
//! let metrics = TelemetryMetrics::default();
//! metrics.packets_received.fetch_add(1, Ordering::Relaxed);
//!
//! let snapshot = metrics.snapshot();
//! assert_eq!(snapshot.packets_received, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// 命令通道指标
#[derive(Debug, Default)]
pub struct ChannelMetrics {
    /// 成功写入的命令总数（控制、读请求、写请求）
    pub commands_sent: AtomicU64,
    /// 对象读取次数
    pub object_reads: AtomicU64,
    /// 对象写入次数
    pub object_writes: AtomicU64,
    /// TCP 重连次数（读取失败后）
    pub reconnects: AtomicU64,
    /// 发送失败次数
    pub send_errors: AtomicU64,
    /// 重试后仍失败的读取次数
    pub read_failures: AtomicU64,
}

impl ChannelMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> ChannelMetricsSnapshot {
        ChannelMetricsSnapshot {
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
            object_reads: self.object_reads.load(Ordering::Relaxed),
            object_writes: self.object_writes.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            send_errors: self.send_errors.load(Ordering::Relaxed),
            read_failures: self.read_failures.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        self.commands_sent.store(0, Ordering::Relaxed);
        self.object_reads.store(0, Ordering::Relaxed);
        self.object_writes.store(0, Ordering::Relaxed);
        self.reconnects.store(0, Ordering::Relaxed);
        self.send_errors.store(0, Ordering::Relaxed);
        self.read_failures.store(0, Ordering::Relaxed);
    }
}

/// 命令通道指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelMetricsSnapshot {
    pub commands_sent: u64,
    pub object_reads: u64,
    pub object_writes: u64,
    pub reconnects: u64,
    pub send_errors: u64,
    pub read_failures: u64,
}

/// 遥测链路指标
#[derive(Debug, Default)]
pub struct TelemetryMetrics {
    /// 有效遥测帧数
    pub packets_received: AtomicU64,
    /// 长度错误被丢弃的数据报数
    pub packets_dropped: AtomicU64,
    /// 接收轮询超时次数（无数据时属正常现象）
    pub receive_timeouts: AtomicU64,
    /// 观察者回调 panic 次数
    pub observer_failures: AtomicU64,
    /// socket 错误次数
    pub socket_errors: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TelemetryMetricsSnapshot {
        TelemetryMetricsSnapshot {
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_dropped: self.packets_dropped.load(Ordering::Relaxed),
            receive_timeouts: self.receive_timeouts.load(Ordering::Relaxed),
            observer_failures: self.observer_failures.load(Ordering::Relaxed),
            socket_errors: self.socket_errors.load(Ordering::Relaxed),
        }
    }
}

/// 遥测链路指标快照
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TelemetryMetricsSnapshot {
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub receive_timeouts: u64,
    pub observer_failures: u64,
    pub socket_errors: u64,
}

impl TelemetryMetricsSnapshot {
    /// 丢弃率（百分比，0.0–100.0）
    pub fn drop_rate(&self) -> f64 {
        let total = self.packets_received + self.packets_dropped;
        if total == 0 {
            return 0.0;
        }
        (self.packets_dropped as f64 / total as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_metrics_snapshot_and_reset() {
        let metrics = ChannelMetrics::new();
        metrics.commands_sent.fetch_add(3, Ordering::Relaxed);
        metrics.reconnects.fetch_add(1, Ordering::Relaxed);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.commands_sent, 3);
        assert_eq!(snapshot.reconnects, 1);
        assert_eq!(snapshot.read_failures, 0);

        metrics.reset();
        assert_eq!(metrics.snapshot(), ChannelMetricsSnapshot::default());
    }

    #[test]
    fn test_drop_rate() {
        let snapshot = TelemetryMetricsSnapshot::default();
        assert_eq!(snapshot.drop_rate(), 0.0);

        let snapshot = TelemetryMetricsSnapshot {
            packets_received: 3,
            packets_dropped: 1,
            ..Default::default()
        };
        assert!((snapshot.drop_rate() - 25.0).abs() < f64::EPSILON);
    }
}

//! 驱动层模块
//!
//! 本模块提供 HDrive 伺服驱动器的两条独立通道：
//! - 命令通道（[`CommandChannel`]）：单连接、串行化的 TCP 请求/响应，对象读取带一次重连重试
//! - 遥测接收（[`TelemetryReceiver`]）：独立线程接收 UDP 遥测帧，ArcSwap 无锁读取最新帧
//!
//! 两条通道的临界区互相独立：命令延迟不会阻塞遥测分发。
//!
//! # 使用场景
//!
//! 适用于需要自行编排连接握手、或注入自定义传输的场景。
//! 大多数用户应该使用 `hdrive-client` 提供的 `DriveSession`。

pub mod channel;
mod error;
pub mod hooks;
pub mod metrics;
pub mod pipeline;
pub mod state;
pub mod telemetry;

pub use channel::{ChannelConfig, CommandChannel};
pub use error::DriverError;
pub use hooks::{ObserverSlot, TelemetryCallback};
pub use metrics::{ChannelMetrics, ChannelMetricsSnapshot, TelemetryMetrics, TelemetryMetricsSnapshot};
pub use pipeline::{TelemetryContext, telemetry_loop};
pub use state::{AtomicConnectionState, ConnectionState, TelemetryState};
pub use telemetry::{TelemetryConfig, TelemetryReceiver};

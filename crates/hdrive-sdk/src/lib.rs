//! HDrive SDK - HDrive17-ETH 伺服驱动器 Rust SDK
//!
//! 通过以太网控制 Henschel Robotics HDrive17-ETH：TCP 文本命令通道 + UDP 二进制遥测。
//!
//! # 架构设计
//!
//! 本 SDK 采用分层架构，从底层到高层：
//!
//! - **协议层** (`protocol`): 命令文本编码、响应解析、遥测帧解码（无 IO）
//! - **传输层** (`net`): TCP 连接器与 UDP 遥测 socket
//! - **驱动层** (`driver`): 串行化命令通道、遥测接收线程
//! - **客户端层** (`client`): 连接握手与会话生命周期
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use hdrive_sdk::prelude::*;
//!
//! hdrive_sdk::init_logger();
//!
//! let session = HDriveBuilder::new("192.168.122.102").connect()?;
//! session.move_to(90.0, MotionDefaults::MOVE_SPEED, MotionDefaults::TORQUE_LIMIT, 5000, 5000)?;
//!
//! if let Some(frame) = session.latest_telemetry() {
//!     println!("position = {}, temperature = {:.1} °C", frame.position, frame.temperature_celsius());
//! }
//! # Ok::<(), HDriveError>(())
//! ```

pub use hdrive_client as client;
pub use hdrive_driver as driver;
pub use hdrive_net as net;
pub use hdrive_protocol as protocol;

// Prelude 模块
pub mod prelude;

// --- 用户以此为界 ---

// 客户端层（推荐入口）
pub use client::{DriveSession, HDriveBuilder, HDriveError, MotionDefaults, SessionConfig};

// 驱动层常用类型
pub use driver::{DriverError, TelemetryCallback, TelemetryState};

// 协议层
pub use protocol::{ControlCommand, ControlFraming, ControlMode, ObjectRef, ProtocolError, TelemetryFrame};

use std::sync::Once;
use tracing_subscriber::EnvFilter;

static LOGGER: Once = Once::new();

/// 初始化日志
///
/// 安装 `tracing-subscriber` fmt 输出，过滤规则取自 `RUST_LOG`（默认 `info`），
/// 并把 `log` crate 的记录桥接到 `tracing`。重复调用无副作用；
/// 若进程已安装了其他全局 subscriber，则保留已有的。
pub fn init_logger() {
    LOGGER.call_once(|| {
        let _ = tracing_log::LogTracer::init();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

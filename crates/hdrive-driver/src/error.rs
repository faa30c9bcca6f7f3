//! 驱动层错误类型定义

use hdrive_net::NetError;
use hdrive_protocol::{ObjectRef, ProtocolError};
use thiserror::Error;

/// 驱动层错误类型
#[derive(Error, Debug)]
pub enum DriverError {
    /// 建立 TCP 连接失败
    #[error("Could not connect to {peer}: {source}")]
    Connection {
        peer: String,
        #[source]
        source: NetError,
    },

    /// 发送命令失败（通道已被标记为断开）
    #[error("Failed to send command: {0}")]
    Send(#[source] NetError),

    /// 对象读取过程中重连失败
    #[error("Failed to reconnect TCP to {peer}: {source}")]
    Reconnect {
        peer: String,
        #[source]
        source: NetError,
    },

    /// 重连重试后仍未收到完整响应
    #[error("Failed to read {object} after reconnect")]
    ReadFailed { object: ObjectRef },

    /// 响应含错误标记，或无法解析
    #[error("Invalid response for {object}: {source}")]
    Response {
        object: ObjectRef,
        #[source]
        source: ProtocolError,
    },

    /// 通道未连接
    #[error("Not connected")]
    NotConnected,

    /// 遥测 UDP 端口绑定失败
    #[error("Failed to bind UDP telemetry socket on port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: NetError,
    },
}

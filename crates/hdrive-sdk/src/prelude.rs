//! Prelude - 常用类型的便捷导入
//!
//! ```rust
//! use hdrive_sdk::prelude::*;
//! ```

// 客户端层（推荐使用）
pub use crate::client::{DriveSession, HDriveBuilder, MotionDefaults, SessionConfig};

// 协议层
pub use crate::protocol::{ControlCommand, ControlMode, ObjectRef, TelemetryFrame};
pub use crate::protocol::{
    AUTOSEND_OBJECT, FIRMWARE_VERSION_OBJECT, TCP_PORT_OBJECT, TICKET_PROTOCOL_OBJECT,
    UDP_ENABLE_OBJECT, UDP_PORT_OBJECT,
};

// 遥测回调
pub use crate::driver::{TelemetryCallback, TelemetryState};

// 错误类型
pub use crate::client::HDriveError;
pub use crate::driver::DriverError;
pub use crate::protocol::ProtocolError;

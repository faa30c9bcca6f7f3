//! 协议常量
//!
//! 网络端口、握手阶段访问的对象地址、固件门限。

use crate::ObjectRef;

/// TCP 命令通道默认端口
pub const DEFAULT_TCP_PORT: u16 = 1000;

/// UDP 遥测通道默认端口
pub const DEFAULT_UDP_PORT: u16 = 1001;

/// 固件版本（m3s0，只读）
pub const FIRMWARE_VERSION_OBJECT: ObjectRef = ObjectRef::new(3, 0);

/// 驱动器配置的 TCP 端口（m4s16）
pub const TCP_PORT_OBJECT: ObjectRef = ObjectRef::new(4, 16);

/// 驱动器配置的 UDP 端口（m4s17）
pub const UDP_PORT_OBJECT: ObjectRef = ObjectRef::new(4, 17);

/// UDP 通信使能（m4s19）
pub const UDP_ENABLE_OBJECT: ObjectRef = ObjectRef::new(4, 19);

/// 遥测协议选择（m4s22）
pub const TICKET_PROTOCOL_OBJECT: ObjectRef = ObjectRef::new(4, 22);

/// 自动发送使能（m4s34）
pub const AUTOSEND_OBJECT: ObjectRef = ObjectRef::new(4, 34);

/// m4s22 取值：132 字节 Binary-Ticket 格式
pub const BINARY_TICKET_PROTOCOL: i32 = 3;

/// 支持的最低固件版本
pub const MIN_FIRMWARE_VERSION: i32 = 266;

/// 驱动器响应中的错误标记
pub const DEVICE_ERROR_MARKER: &str = "error=";

//! # HDrive Protocol
//!
//! HDrive17-ETH 伺服驱动器通信协议定义（无 IO、无状态）
//!
//! ## 模块
//!
//! - `constants`: 端口、对象地址与固件门限
//! - `control`: 运动控制命令构建（`<control ... />`）
//! - `object`: 对象读写请求构建与响应解析（`<objRead>` / `<objWrite>` / `<r>`）
//! - `telemetry`: UDP 二进制遥测帧（Binary-Ticket）解析
//!
//! ## 字节序
//!
//! TCP 命令通道是 ASCII 文本；UDP 遥测帧是 33 个小端 `i32`。

pub mod constants;
pub mod control;
pub mod object;
pub mod telemetry;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use object::*;
pub use telemetry::*;

use std::fmt;
use thiserror::Error;

/// 驱动器对象地址（index / subindex）
///
/// 每个对象都是一个有符号 32 位整数参数，没有内在单位（由调用方解释，
/// 例如 1/10 °C、mNm）。显示格式与驱动器手册一致：`m{index}s{subindex}`。
///
/// ```rust
/// use hdrive_protocol::ObjectRef;
///
/// let obj = ObjectRef::new(4, 22);
/// assert_eq!(obj.to_string(), "m4s22");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ObjectRef {
    /// 对象索引
    pub index: u16,
    /// 对象子索引
    pub subindex: u16,
}

impl ObjectRef {
    /// 创建对象地址
    pub const fn new(index: u16, subindex: u16) -> Self {
        Self { index, subindex }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}s{}", self.index, self.subindex)
    }
}

impl From<(u16, u16)> for ObjectRef {
    fn from((index, subindex): (u16, u16)) -> Self {
        Self::new(index, subindex)
    }
}

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// 驱动器在响应中返回了错误标记（`error=`）
    #[error("Drive returned error: {response}")]
    DeviceError { response: String },

    /// 响应中找不到 `v="..."` 字段，或值不是 32 位整数
    #[error("Missing or malformed value in response: {response}")]
    MissingValue { response: String },

    #[error("Unknown control mode: {0}")]
    UnknownMode(u8),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_ref_display() {
        assert_eq!(ObjectRef::new(3, 0).to_string(), "m3s0");
        assert_eq!(ObjectRef::new(4, 34).to_string(), "m4s34");
    }

    #[test]
    fn test_object_ref_from_tuple() {
        let obj: ObjectRef = (4, 17).into();
        assert_eq!(obj, UDP_PORT_OBJECT);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 132,
            actual: 64,
        };
        assert_eq!(err.to_string(), "Invalid frame length: expected 132, got 64");

        let err = ProtocolError::DeviceError {
            response: "<r a=\"9\" b=\"9\" error=\"1\" />".to_string(),
        };
        assert!(err.to_string().contains("Drive returned error"));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_object_ref_serde() {
        let obj = ObjectRef::new(4, 19);
        let json = serde_json::to_string(&obj).unwrap();
        let back: ObjectRef = serde_json::from_str(&json).unwrap();
        assert_eq!(obj, back);
    }
}

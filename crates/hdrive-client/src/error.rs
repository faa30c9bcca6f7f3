//! 会话层错误类型
//!
//! 调用方只需要区分五类失败：
//!
//! ```rust
//! use hdrive_client::HDriveError;
//!
//! fn report(err: &HDriveError) -> &'static str {
//!     match err {
//!         HDriveError::Connection { .. } => "drive unreachable",
//!         HDriveError::FirmwareVersion { .. } => "update the drive firmware",
//!         HDriveError::Command(_) => "command failed",
//!         HDriveError::NotConnected => "call connect() first",
//!         HDriveError::Config(_) => "fix the configuration file",
//!     }
//! }
//! ```

use hdrive_driver::DriverError;
use thiserror::Error;

/// HDrive 会话错误
#[derive(Debug, Error)]
pub enum HDriveError {
    // ==================== Connect ====================
    /// 初始 TCP 连接失败
    #[error("Could not connect to HDrive at {peer}: {source}")]
    Connection {
        /// 目标地址
        peer: String,
        #[source]
        source: DriverError,
    },

    /// 固件版本不可读或过旧
    #[error("Unsupported firmware: {detail}")]
    FirmwareVersion {
        /// 读到的版本（不可读时为 `None`）
        version: Option<i32>,
        /// 最低要求版本
        minimum: i32,
        /// 说明
        detail: String,
    },

    // ==================== Runtime ====================
    /// 命令失败（发送失败、重试耗尽、驱动器返回错误或响应无法解析）
    #[error("Command failed: {0}")]
    Command(#[source] DriverError),

    /// 会话未连接
    #[error("Not connected to HDrive")]
    NotConnected,

    // ==================== Configuration ====================
    /// 配置无效或无法读取
    #[error("Configuration error: {0}")]
    Config(String),
}

impl HDriveError {
    /// 是否为连接中断类错误（重新 `connect` 可能恢复）
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            HDriveError::NotConnected
                | HDriveError::Command(DriverError::Send(_))
                | HDriveError::Command(DriverError::Reconnect { .. })
        )
    }
}

impl From<DriverError> for HDriveError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotConnected => HDriveError::NotConnected,
            other => HDriveError::Command(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hdrive_net::NetError;
    use hdrive_protocol::ObjectRef;

    #[test]
    fn test_from_driver_error() {
        let err: HDriveError = DriverError::NotConnected.into();
        assert!(matches!(err, HDriveError::NotConnected));

        let err: HDriveError = DriverError::ReadFailed {
            object: ObjectRef::new(4, 17),
        }
        .into();
        assert!(matches!(err, HDriveError::Command(DriverError::ReadFailed { .. })));
        assert_eq!(err.to_string(), "Command failed: Failed to read m4s17 after reconnect");
    }

    #[test]
    fn test_is_connection_lost() {
        assert!(HDriveError::NotConnected.is_connection_lost());
        assert!(HDriveError::Command(DriverError::Send(NetError::Closed)).is_connection_lost());
        assert!(
            !HDriveError::Command(DriverError::ReadFailed {
                object: ObjectRef::new(3, 0)
            })
            .is_connection_lost()
        );
        assert!(!HDriveError::Config("bad".into()).is_connection_lost());
    }

    #[test]
    fn test_firmware_error_display() {
        let err = HDriveError::FirmwareVersion {
            version: Some(265),
            minimum: 266,
            detail: "firmware version 265 is too old (minimum 266)".into(),
        };
        assert_eq!(
            err.to_string(),
            "Unsupported firmware: firmware version 265 is too old (minimum 266)"
        );
    }
}

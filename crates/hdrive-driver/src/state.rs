//! 连接状态定义
//!
//! 命令通道与遥测接收各自维护独立的状态。

use std::sync::atomic::{AtomicU8, Ordering};

/// 命令通道连接状态
///
/// ```text
/// Disconnected --open--> Connected --IO error / close--> Disconnected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ConnectionState {
    #[default]
    Disconnected = 0,
    Connected = 1,
}

impl ConnectionState {
    /// 从 u8 转换，无效值视为 Disconnected
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Connected,
            _ => Self::Disconnected,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }
}

/// 连接状态（原子版本，用于线程间共享）
#[derive(Debug, Default)]
pub struct AtomicConnectionState {
    inner: AtomicU8,
}

impl AtomicConnectionState {
    pub fn new(state: ConnectionState) -> Self {
        Self {
            inner: AtomicU8::new(state.as_u8()),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.inner.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.inner.store(state.as_u8(), Ordering::Release);
    }

    /// 设置新状态并返回旧状态
    pub fn swap(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.inner.swap(state.as_u8(), Ordering::AcqRel))
    }
}

/// 遥测接收状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TelemetryState {
    #[default]
    Stopped,
    Running,
}

impl TelemetryState {
    pub fn is_running(self) -> bool {
        self == Self::Running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_state_conversion() {
        assert_eq!(ConnectionState::from_u8(0), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::from_u8(1), ConnectionState::Connected);
        assert_eq!(ConnectionState::from_u8(255), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::Connected.as_u8(), 1);
    }

    #[test]
    fn test_atomic_connection_state() {
        let state = AtomicConnectionState::default();
        assert_eq!(state.get(), ConnectionState::Disconnected);

        state.set(ConnectionState::Connected);
        assert!(state.get().is_connected());

        let old = state.swap(ConnectionState::Disconnected);
        assert_eq!(old, ConnectionState::Connected);
        assert_eq!(state.get(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_telemetry_state_default() {
        assert_eq!(TelemetryState::default(), TelemetryState::Stopped);
        assert!(TelemetryState::Running.is_running());
    }
}

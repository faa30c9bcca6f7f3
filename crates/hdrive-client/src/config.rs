//! 会话配置
//!
//! 可以从 TOML 加载，未出现的字段取默认值：
//!
//! ```toml
//! ip = "192.168.122.102"
//! tcp_port = 1000
//! # udp_port 省略时从驱动器读取 m4s17
//! config_settle_ms = 100
//! ```

use crate::error::HDriveError;
use hdrive_driver::{ChannelConfig, TelemetryConfig};
use hdrive_protocol::{ControlFraming, DEFAULT_TCP_PORT, DEFAULT_UDP_PORT};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 出厂默认 IP
pub const DEFAULT_IP: &str = "192.168.122.102";

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// 驱动器 IP 或主机名
    pub ip: String,
    /// TCP 命令端口
    pub tcp_port: u16,
    /// UDP 遥测端口；`None` 时连接过程中从驱动器读取，读取失败回退到 1001
    pub udp_port: Option<u16>,
    /// TCP 连接/读/写超时（毫秒）
    pub io_timeout_ms: u64,
    /// 写对象后的稳定时间（微秒）
    pub write_settle_us: u64,
    /// 握手阶段两次配置写入之间的间隔（毫秒）
    pub config_settle_ms: u64,
    /// 遥测接收轮询间隔（毫秒）
    pub telemetry_poll_ms: u64,
    /// 停止遥测线程的 join 上限（毫秒）
    pub join_timeout_ms: u64,
    /// 控制命令外层是否加引号
    pub quote_control_commands: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ip: DEFAULT_IP.to_string(),
            tcp_port: DEFAULT_TCP_PORT,
            udp_port: None,
            io_timeout_ms: 5000,
            write_settle_us: 1000,
            config_settle_ms: 100,
            telemetry_poll_ms: 500,
            join_timeout_ms: 2000,
            quote_control_commands: true,
        }
    }
}

impl SessionConfig {
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            ip: ip.into(),
            ..Self::default()
        }
    }

    /// 从 TOML 文本解析
    pub fn from_toml_str(text: &str) -> Result<Self, HDriveError> {
        let config: Self =
            toml::from_str(text).map_err(|e| HDriveError::Config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// 从 TOML 文件加载
    pub fn load(path: impl AsRef<Path>) -> Result<Self, HDriveError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| HDriveError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, HDriveError> {
        toml::to_string(self).map_err(|e| HDriveError::Config(e.to_string()))
    }

    /// 检查取值范围
    pub fn validate(&self) -> Result<(), HDriveError> {
        if self.ip.trim().is_empty() {
            return Err(HDriveError::Config("ip must not be empty".into()));
        }
        if self.tcp_port == 0 {
            return Err(HDriveError::Config("tcp_port must not be 0".into()));
        }
        if self.io_timeout_ms == 0 {
            return Err(HDriveError::Config("io_timeout_ms must be positive".into()));
        }
        if self.telemetry_poll_ms == 0 {
            return Err(HDriveError::Config("telemetry_poll_ms must be positive".into()));
        }
        Ok(())
    }

    /// 连接前的 UDP 端口（未配置时为默认值）
    pub fn initial_udp_port(&self) -> u16 {
        self.udp_port.unwrap_or(DEFAULT_UDP_PORT)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }

    pub fn config_settle(&self) -> Duration {
        Duration::from_millis(self.config_settle_ms)
    }

    pub fn framing(&self) -> ControlFraming {
        if self.quote_control_commands {
            ControlFraming::Quoted
        } else {
            ControlFraming::Bare
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            response_timeout: self.io_timeout(),
            write_settle: Duration::from_micros(self.write_settle_us),
            framing: self.framing(),
            ..ChannelConfig::default()
        }
    }

    pub fn telemetry_config(&self) -> TelemetryConfig {
        TelemetryConfig {
            poll_interval: Duration::from_millis(self.telemetry_poll_ms),
            join_timeout: Duration::from_millis(self.join_timeout_ms),
            ..TelemetryConfig::default()
        }
    }
}

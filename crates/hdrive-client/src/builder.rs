//! Builder 模式实现
//!
//! 提供链式构造 [`DriveSession`] 的便捷方式。

use crate::config::SessionConfig;
use crate::error::HDriveError;
use crate::session::DriveSession;
use hdrive_protocol::ControlFraming;
use std::time::Duration;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// HDrive Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use hdrive_client::HDriveBuilder;
/// use std::time::Duration;
///
/// // 构造并立即连接
/// let session = HDriveBuilder::new("192.168.122.102")
///     .udp_port(1001)
///     .io_timeout(Duration::from_secs(2))
///     .connect()?;
///
/// println!("firmware = {:?}", session.firmware_version());
/// # Ok::<(), hdrive_client::HDriveError>(())
/// ```
#[derive(Debug, Clone)]
pub struct HDriveBuilder {
    config: SessionConfig,
}

impl HDriveBuilder {
    /// 以驱动器 IP 创建 Builder，其余参数取默认值
    pub fn new(ip: impl Into<String>) -> Self {
        Self {
            config: SessionConfig::new(ip),
        }
    }

    /// 从已有配置（例如 TOML 文件）开始
    pub fn from_config(config: SessionConfig) -> Self {
        Self { config }
    }

    /// TCP 命令端口（默认 1000）
    pub fn tcp_port(mut self, port: u16) -> Self {
        self.config.tcp_port = port;
        self
    }

    /// 显式指定 UDP 遥测端口，跳过从驱动器读取 m4s17
    pub fn udp_port(mut self, port: u16) -> Self {
        self.config.udp_port = Some(port);
        self
    }

    /// TCP 连接/读/写超时（默认 5 s）
    pub fn io_timeout(mut self, timeout: Duration) -> Self {
        self.config.io_timeout_ms = millis(timeout);
        self
    }

    /// 写对象后的稳定时间（默认 1 ms）
    pub fn write_settle(mut self, settle: Duration) -> Self {
        self.config.write_settle_us = u64::try_from(settle.as_micros()).unwrap_or(u64::MAX);
        self
    }

    /// 握手阶段配置写入之间的间隔（默认 100 ms）
    pub fn config_settle(mut self, settle: Duration) -> Self {
        self.config.config_settle_ms = millis(settle);
        self
    }

    /// 遥测接收轮询间隔（默认 500 ms）
    pub fn telemetry_poll_interval(mut self, interval: Duration) -> Self {
        self.config.telemetry_poll_ms = millis(interval);
        self
    }

    /// 停止遥测线程时的 join 上限（默认 2 s）
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.config.join_timeout_ms = millis(timeout);
        self
    }

    pub fn control_framing(mut self, framing: ControlFraming) -> Self {
        self.config.quote_control_commands = framing == ControlFraming::Quoted;
        self
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// 构造未连接的会话
    pub fn build(self) -> Result<DriveSession, HDriveError> {
        DriveSession::new(self.config)
    }

    /// 构造并连接
    pub fn connect(self) -> Result<DriveSession, HDriveError> {
        let session = self.build()?;
        session.connect()?;
        Ok(session)
    }
}

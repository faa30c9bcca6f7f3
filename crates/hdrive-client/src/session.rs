//! 驱动器会话
//!
//! [`DriveSession`] 组合命令通道与遥测接收器，负责连接握手与生命周期：
//!
//! 1. 打开 TCP 命令通道
//! 2. 读取固件版本 `m3s0`，低于 266 时关闭并报错
//! 3. 未显式配置 UDP 端口时读取 `m4s17`
//! 4. 写入 `m4s19 = 1`、`m4s34 = 1`、`m4s22 = 3`（失败只告警）
//! 5. 启动 UDP 遥测接收
//!
//! 会话在 `Drop` 时自动关闭。

use crate::config::SessionConfig;
use crate::error::HDriveError;
use hdrive_driver::{
    ChannelMetricsSnapshot, CommandChannel, TelemetryCallback, TelemetryMetricsSnapshot,
    TelemetryReceiver, TelemetryState,
};
use hdrive_net::{TcpConnector, TransportConnector};
use hdrive_protocol::{
    AUTOSEND_OBJECT, BINARY_TICKET_PROTOCOL, ControlCommand, ControlMode, FIRMWARE_VERSION_OBJECT,
    MIN_FIRMWARE_VERSION, ObjectRef, TICKET_PROTOCOL_OBJECT, TelemetryFrame, UDP_ENABLE_OBJECT,
    UDP_PORT_OBJECT,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU16, Ordering};
use std::thread;
use tracing::{debug, info, warn};

/// 运动命令的常用默认值
///
/// ```rust,no_run
/// use hdrive_client::{DriveSession, MotionDefaults, SessionConfig};
///
/// let session = DriveSession::new(SessionConfig::new("192.168.122.102"))?;
/// session.connect()?;
/// session.move_to(
///     90.0,
///     MotionDefaults::MOVE_SPEED,
///     MotionDefaults::TORQUE_LIMIT,
///     MotionDefaults::RAMP,
///     MotionDefaults::RAMP,
/// )?;
/// # Ok::<(), hdrive_client::HDriveError>(())
/// ```
#[derive(Debug, Clone, Copy)]
pub struct MotionDefaults;

impl MotionDefaults {
    /// `move_to` 默认速度
    pub const MOVE_SPEED: i32 = 100;
    /// 默认扭矩限幅（20%）
    pub const TORQUE_LIMIT: i32 = 200;
    /// 位置/速度模式默认加减速斜坡
    pub const RAMP: i32 = 5000;
    /// 扭矩模式默认加减速斜坡
    pub const TORQUE_RAMP: i32 = 0;
}

/// HDrive 驱动器会话
///
/// 所有方法都只需要 `&self`，可以放进 `Arc` 在多个线程间共享；
/// 命令在命令通道内串行执行，遥测读取不受命令延迟影响。
pub struct DriveSession<C: TransportConnector = TcpConnector> {
    config: SessionConfig,
    channel: CommandChannel<C>,
    telemetry: TelemetryReceiver,
    /// 串行化 connect / close
    lifecycle: Mutex<()>,
    /// 握手完成且未关闭
    open: AtomicBool,
    udp_port: AtomicU16,
    firmware_version: Mutex<Option<i32>>,
}

impl DriveSession<TcpConnector> {
    /// 创建未连接的会话（解析地址，不建立连接）
    pub fn new(config: SessionConfig) -> Result<Self, HDriveError> {
        config.validate()?;
        let connector = TcpConnector::resolve(&config.ip, config.tcp_port, config.io_timeout())
            .map_err(|e| HDriveError::Config(format!("cannot resolve drive address: {e}")))?;
        Ok(Self::with_connector(connector, config))
    }
}

impl<C: TransportConnector> DriveSession<C> {
    /// 使用自定义连接器创建会话
    pub fn with_connector(connector: C, config: SessionConfig) -> Self {
        let channel = CommandChannel::new(connector, config.channel_config());
        let telemetry = TelemetryReceiver::new(config.telemetry_config());
        let udp_port = AtomicU16::new(config.initial_udp_port());

        Self {
            config,
            channel,
            telemetry,
            lifecycle: Mutex::new(()),
            open: AtomicBool::new(false),
            udp_port,
            firmware_version: Mutex::new(None),
        }
    }

    /// 连接驱动器并完成握手（已连接时为空操作）
    ///
    /// # 错误
    /// - `HDriveError::Connection`: TCP 连接失败
    /// - `HDriveError::FirmwareVersion`: 固件版本不可读或低于 266（会话已关闭）
    pub fn connect(&self) -> Result<(), HDriveError> {
        let _lifecycle = self.lifecycle.lock();
        if self.is_connected() {
            return Ok(());
        }

        info!(
            "Connecting to HDrive at {} (TCP {}, UDP {}) ...",
            self.config.ip,
            self.config.tcp_port,
            self.udp_port()
        );

        self.channel.open().map_err(|source| HDriveError::Connection {
            peer: self.channel.peer(),
            source,
        })?;
        self.open.store(true, Ordering::Release);

        let version = match self.check_firmware_version() {
            Ok(version) => version,
            Err(e) => {
                self.shutdown();
                return Err(e);
            },
        };
        *self.firmware_version.lock() = Some(version);

        self.negotiate_udp_port();
        self.configure_telemetry();

        // 绑定失败已在接收器内以 error 级别记录；命令通道仍可用
        let _ = self.telemetry.start(self.udp_port());

        info!("Connected to HDrive at {} (firmware {})", self.channel.peer(), version);
        Ok(())
    }

    fn check_firmware_version(&self) -> Result<i32, HDriveError> {
        let version = self.channel.read_object(FIRMWARE_VERSION_OBJECT).map_err(|e| {
            HDriveError::FirmwareVersion {
                version: None,
                minimum: MIN_FIRMWARE_VERSION,
                detail: format!("could not read firmware version ({FIRMWARE_VERSION_OBJECT}): {e}"),
            }
        })?;
        info!("Firmware version ({}): {}", FIRMWARE_VERSION_OBJECT, version);

        if version < MIN_FIRMWARE_VERSION {
            return Err(HDriveError::FirmwareVersion {
                version: Some(version),
                minimum: MIN_FIRMWARE_VERSION,
                detail: format!(
                    "firmware version {version} is too old, minimum required is {MIN_FIRMWARE_VERSION}; please update the HDrive17-ETH firmware"
                ),
            });
        }
        Ok(version)
    }

    /// 未显式配置 UDP 端口时采用驱动器报告的端口
    fn negotiate_udp_port(&self) {
        if let Some(port) = self.config.udp_port {
            self.udp_port.store(port, Ordering::Release);
            return;
        }

        match self.channel.read_object(UDP_PORT_OBJECT) {
            Ok(reported) if reported > 0 => match u16::try_from(reported) {
                Ok(port) => {
                    self.udp_port.store(port, Ordering::Release);
                    info!("UDP port read from drive ({}): {}", UDP_PORT_OBJECT, port);
                },
                Err(_) => debug!(
                    "Drive reported UDP port {} out of range, using {}",
                    reported,
                    self.udp_port()
                ),
            },
            Ok(reported) => debug!(
                "Drive reported UDP port {}, using {}",
                reported,
                self.udp_port()
            ),
            Err(e) => debug!(
                "Could not read {} (UDP port), using default {}: {}",
                UDP_PORT_OBJECT,
                self.udp_port(),
                e
            ),
        }
    }

    /// 打开 UDP 通信、自动发送，并选择二进制遥测格式
    fn configure_telemetry(&self) {
        let steps = [
            (UDP_ENABLE_OBJECT, 1, "UDP communication enabled"),
            (AUTOSEND_OBJECT, 1, "autosend enabled"),
            (TICKET_PROTOCOL_OBJECT, BINARY_TICKET_PROTOCOL, "binary ticket"),
        ];

        for (i, (obj, value, label)) in steps.into_iter().enumerate() {
            if i > 0 {
                thread::sleep(self.config.config_settle());
            }
            debug!("Writing {} = {} ({}) ...", obj, value, label);
            if let Err(e) = self.channel.write_object(obj, value) {
                warn!("Could not write {} = {} ({}): {}", obj, value, label, e);
            }
        }
    }

    /// 关闭会话（幂等）
    ///
    /// 依次：发送失能命令（连接可用时）、停止遥测、关闭 TCP 连接。
    pub fn close(&self) {
        let _lifecycle = self.lifecycle.lock();
        self.shutdown();
    }

    fn shutdown(&self) {
        let was_open = self.open.swap(false, Ordering::AcqRel);
        if self.channel.is_connected()
            && let Err(e) = self.channel.send_disable()
        {
            debug!("Disable command on close failed: {}", e);
        }
        self.telemetry.stop();
        self.channel.shutdown();
        if was_open {
            info!("Disconnected from HDrive at {}", self.channel.peer());
        }
    }

    // ==================== Motion ====================

    /// 位置模式：移动到绝对位置（度）
    pub fn move_to(
        &self,
        position_deg: f64,
        speed: i32,
        torque: i32,
        acceleration: i32,
        deceleration: i32,
    ) -> Result<(), HDriveError> {
        self.send_raw(ControlCommand {
            position: position_deg,
            speed,
            torque,
            mode: ControlMode::PositionControl,
            acceleration,
            deceleration,
        })
    }

    /// 速度模式：以恒定速度运行
    pub fn set_speed(
        &self,
        speed: i32,
        torque: i32,
        acceleration: i32,
        deceleration: i32,
    ) -> Result<(), HDriveError> {
        self.send_raw(ControlCommand {
            speed,
            torque,
            mode: ControlMode::VelocityControl,
            acceleration,
            deceleration,
            ..ControlCommand::default()
        })
    }

    /// 扭矩模式
    pub fn set_torque(
        &self,
        torque: i32,
        acceleration: i32,
        deceleration: i32,
    ) -> Result<(), HDriveError> {
        self.send_raw(ControlCommand {
            torque,
            mode: ControlMode::TorqueControl,
            acceleration,
            deceleration,
            ..ControlCommand::default()
        })
    }

    /// 停止（mode=0, torque=0）
    pub fn stop(&self) -> Result<(), HDriveError> {
        self.send_raw(ControlCommand::disable())
    }

    /// 失能，电机自由转动
    pub fn disable(&self) -> Result<(), HDriveError> {
        self.send_raw(ControlCommand::disable())
    }

    /// 发送任意控制命令
    pub fn send_raw(&self, cmd: ControlCommand) -> Result<(), HDriveError> {
        self.ensure_open()?;
        self.channel.send_control(&cmd)?;
        Ok(())
    }

    // ==================== Objects ====================

    pub fn read_object(&self, obj: ObjectRef) -> Result<i32, HDriveError> {
        self.ensure_open()?;
        Ok(self.channel.read_object(obj)?)
    }

    pub fn write_object(&self, obj: ObjectRef, value: i32) -> Result<(), HDriveError> {
        self.ensure_open()?;
        Ok(self.channel.write_object(obj, value)?)
    }

    fn ensure_open(&self) -> Result<(), HDriveError> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(HDriveError::NotConnected)
        }
    }

    // ==================== Telemetry ====================

    /// 最新遥测帧；尚未收到数据时为 `None`
    pub fn latest_telemetry(&self) -> Option<Arc<TelemetryFrame>> {
        self.telemetry.latest()
    }

    /// 注册遥测回调（替换已有的）
    ///
    /// 可以在 `connect` 之前调用；回调在遥测线程上执行。
    pub fn on_telemetry<F>(&self, callback: F)
    where
        F: TelemetryCallback + 'static,
    {
        self.telemetry.set_observer(callback);
    }

    // ==================== Accessors ====================

    pub fn is_connected(&self) -> bool {
        self.open.load(Ordering::Acquire) && self.channel.is_connected()
    }

    /// 最近一次握手读到的固件版本
    pub fn firmware_version(&self) -> Option<i32> {
        *self.firmware_version.lock()
    }

    /// 遥测 UDP 端口（连接后为协商结果）
    pub fn udp_port(&self) -> u16 {
        self.udp_port.load(Ordering::Acquire)
    }

    /// 遥测实际绑定的本地端口
    pub fn telemetry_local_port(&self) -> Option<u16> {
        self.telemetry.local_port()
    }

    pub fn channel_metrics(&self) -> ChannelMetricsSnapshot {
        self.channel.metrics()
    }

    pub fn telemetry_metrics(&self) -> TelemetryMetricsSnapshot {
        self.telemetry.metrics()
    }

    pub fn telemetry_state(&self) -> TelemetryState {
        self.telemetry.state()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn peer(&self) -> String {
        self.channel.peer()
    }
}

impl<C: TransportConnector> Drop for DriveSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

impl<C: TransportConnector> std::fmt::Debug for DriveSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriveSession")
            .field("peer", &self.channel.peer())
            .field("connected", &self.is_connected())
            .field("udp_port", &self.udp_port())
            .field("firmware_version", &self.firmware_version())
            .finish()
    }
}

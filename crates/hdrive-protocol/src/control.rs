//! 运动控制命令
//!
//! 控制命令设置驱动器的工作模式与设定值（位置/速度/扭矩/加减速斜坡），
//! 以单条 ASCII 文本发送，驱动器不回复。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// 控制模式（位组合）
///
/// 决定驱动器采用 position/speed/torque 中哪些字段。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum ControlMode {
    /// 失能（电机自由转动）
    Disable = 0,
    /// 扭矩 + 使能
    TorqueControl = 128,
    /// 位置 + 扭矩 + 速度 + 使能
    #[default]
    PositionControl = 129,
    /// 速度 + 扭矩 + 使能
    VelocityControl = 130,
}

impl ControlMode {
    /// 从原始字节转换
    pub fn from_raw(value: u8) -> Result<Self, ProtocolError> {
        Self::try_from(value).map_err(|e| ProtocolError::UnknownMode(e.number))
    }

    /// 原始字节
    pub fn as_raw(self) -> u8 {
        self.into()
    }
}

/// 控制命令外层引号
///
/// 随 SDK 发布的命令格式在整条 `<control ... />` 外多包了一对 `"`。
/// 驱动器接受这种格式；是否也接受不带引号的格式需要在实机上确认，
/// 因此两种都提供，默认保持已验证的 `Quoted`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ControlFraming {
    /// `"<control ... />"`
    #[default]
    Quoted,
    /// `<control ... />`
    Bare,
}

/// 控制命令
///
/// `position` 单位为度，编码时乘以 10 并四舍五入（驱动器编码器单位为 0.1°）。
///
/// # Example
///
/// ```
/// use hdrive_protocol::{ControlCommand, ControlFraming, ControlMode, encode_control};
///
/// let cmd = ControlCommand {
///     position: 90.0,
///     mode: ControlMode::PositionControl,
///     ..ControlCommand::default()
/// };
/// let bytes = encode_control(&cmd, ControlFraming::Bare);
/// assert!(bytes.starts_with(b"<control pos=\"900\""));
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ControlCommand {
    /// 目标位置（度）
    pub position: f64,
    /// 目标速度
    pub speed: i32,
    /// 扭矩（限幅）值，0–1000 对应 0–100%
    pub torque: i32,
    /// 控制模式
    pub mode: ControlMode,
    /// 加速斜坡
    pub acceleration: i32,
    /// 减速斜坡
    pub deceleration: i32,
}

impl Default for ControlCommand {
    fn default() -> Self {
        Self {
            position: 0.0,
            speed: 500,
            torque: 200,
            mode: ControlMode::PositionControl,
            acceleration: 5000,
            deceleration: 5000,
        }
    }
}

impl ControlCommand {
    /// 失能命令（mode=Disable, torque=0，其余字段取默认值）
    pub fn disable() -> Self {
        Self {
            mode: ControlMode::Disable,
            torque: 0,
            ..Self::default()
        }
    }

    /// 编码后的位置值（0.1°）
    pub fn encoded_position(&self) -> i64 {
        (self.position * 10.0).round() as i64
    }
}

/// 构建控制命令文本
pub fn encode_control(cmd: &ControlCommand, framing: ControlFraming) -> Vec<u8> {
    let body = format!(
        "<control pos=\"{}\" speed=\"{}\" torque=\"{}\" mode=\"{}\" acc=\"{}\" decc=\"{}\" />",
        cmd.encoded_position(),
        cmd.speed,
        cmd.torque,
        cmd.mode.as_raw(),
        cmd.acceleration,
        cmd.deceleration,
    );
    match framing {
        ControlFraming::Quoted => format!("\"{body}\"").into_bytes(),
        ControlFraming::Bare => body.into_bytes(),
    }
}

/// 构建失能命令文本
pub fn encode_disable(framing: ControlFraming) -> Vec<u8> {
    encode_control(&ControlCommand::disable(), framing)
}

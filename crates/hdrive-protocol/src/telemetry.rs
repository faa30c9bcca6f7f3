//! UDP 遥测帧（Binary-Ticket）
//!
//! 每个数据报 132 字节 = 33 个小端 `i32`，字段顺序固定：
//!
//! | Word | 字段 |
//! |------|------|
//! | 0 | 系统时间 [µs] |
//! | 1 | 位置 |
//! | 2 | 速度 |
//! | 3 | A 相电流 [mA] |
//! | 4 | 纹波电流补偿 |
//! | 5 | 标定值 [inc] |
//! | 6 | Fid [mA] |
//! | 7 | Fiq [mA] |
//! | 8 | 最近错误 |
//! | 9 | 温度 [1/10 °C] |
//! | 10 | 电机模式 |
//! | 11 | 电机电压 [mV] |
//! | 12–16 | 需求速度 / 位置 / 扭矩 / 加速度 / 减速度 |
//! | 17 | 数字输入状态 |
//! | 18 | 实际状态 |
//! | 19 | 软件版本 |
//! | 20 | 速度 × 1000 |
//! | 21 | 系统时间（重复） |
//! | 22 | 回零完成标志 |
//! | 23–30 | 从站 1–8 位置 |
//! | 31 | 活动从站位掩码 |
//! | 32 | CAN 状态 |

use crate::{ControlMode, ProtocolError};

/// 遥测帧中的字段数
pub const TELEMETRY_WORDS: usize = 33;

/// 遥测帧字节数（33 × 4）
pub const TELEMETRY_FRAME_SIZE: usize = TELEMETRY_WORDS * 4;

/// 从站数量
pub const SLAVE_COUNT: usize = 8;

const SLAVE_POSITIONS_OFFSET: usize = 23;

/// 遥测帧（不可变快照）
///
/// 每个有效数据报构造一次，之后不再修改。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TelemetryFrame {
    /// [0] 系统时间（微秒）
    pub time_us: i32,
    /// [1] 编码器位置
    pub position: i32,
    /// [2] 速度
    pub velocity: i32,
    /// [3] A 相电流 [mA]
    pub phase_a_current: i32,
    /// [4] 纹波电流补偿
    pub ripple_current_comp: i32,
    /// [5] 标定值 [inc]
    pub calibration_value: i32,
    /// [6] Fid [mA]
    pub fid: i32,
    /// [7] Fiq [mA]
    pub fiq: i32,
    /// [8] 最近错误码
    pub last_error: i32,
    /// [9] 温度 [1/10 °C]
    pub temperature: i32,
    /// [10] 电机模式
    pub motor_mode: i32,
    /// [11] 电机电压 [mV]
    pub motor_voltage: i32,
    /// [12] 需求速度
    pub demanded_speed: i32,
    /// [13] 需求位置
    pub demanded_position: i32,
    /// [14] 需求扭矩
    pub demanded_torque: i32,
    /// [15] 需求加速度
    pub demanded_acceleration: i32,
    /// [16] 需求减速度
    pub demanded_deceleration: i32,
    /// [17] 数字输入状态（GPIO）
    pub digital_input_state: i32,
    /// [18] 实际电机状态
    pub actual_state: i32,
    /// [19] 软件版本
    pub software_version: i32,
    /// [20] 速度 × 1000
    pub velocity_milli: i32,
    /// [21] 系统时间
    pub system_time: i32,
    /// [22] 回零完成标志
    pub homing_completed: i32,
    /// [23..=30] 从站 1–8 位置
    pub slave_positions: [i32; SLAVE_COUNT],
    /// [31] 活动从站位掩码
    pub active_slaves: i32,
    /// [32] CAN 总线状态
    pub can_status: i32,
    /// 全部 33 个原始值
    #[cfg_attr(feature = "serde", serde(with = "raw_words"))]
    pub raw: [i32; TELEMETRY_WORDS],
}

impl Default for TelemetryFrame {
    fn default() -> Self {
        Self::from_words([0; TELEMETRY_WORDS])
    }
}

impl TelemetryFrame {
    /// 从 33 个原始值构造
    pub fn from_words(raw: [i32; TELEMETRY_WORDS]) -> Self {
        let mut slave_positions = [0i32; SLAVE_COUNT];
        slave_positions
            .copy_from_slice(&raw[SLAVE_POSITIONS_OFFSET..SLAVE_POSITIONS_OFFSET + SLAVE_COUNT]);

        Self {
            time_us: raw[0],
            position: raw[1],
            velocity: raw[2],
            phase_a_current: raw[3],
            ripple_current_comp: raw[4],
            calibration_value: raw[5],
            fid: raw[6],
            fiq: raw[7],
            last_error: raw[8],
            temperature: raw[9],
            motor_mode: raw[10],
            motor_voltage: raw[11],
            demanded_speed: raw[12],
            demanded_position: raw[13],
            demanded_torque: raw[14],
            demanded_acceleration: raw[15],
            demanded_deceleration: raw[16],
            digital_input_state: raw[17],
            actual_state: raw[18],
            software_version: raw[19],
            velocity_milli: raw[20],
            system_time: raw[21],
            homing_completed: raw[22],
            slave_positions,
            active_slaves: raw[31],
            can_status: raw[32],
            raw,
        }
    }

    /// 打包为 132 字节数据报（设备模拟器 / 测试使用）
    pub fn to_bytes(&self) -> [u8; TELEMETRY_FRAME_SIZE] {
        let mut bytes = [0u8; TELEMETRY_FRAME_SIZE];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(self.raw.iter()) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// 温度（°C）
    pub fn temperature_celsius(&self) -> f64 {
        f64::from(self.temperature) / 10.0
    }

    /// 电机模式（无法识别时返回 `None`）
    pub fn mode(&self) -> Option<ControlMode> {
        u8::try_from(self.motor_mode)
            .ok()
            .and_then(|m| ControlMode::from_raw(m).ok())
    }

    /// 回零是否完成
    pub fn is_homed(&self) -> bool {
        self.homing_completed != 0
    }

    /// 从站 `slave`（0–7）是否活动
    pub fn is_slave_active(&self, slave: usize) -> bool {
        slave < SLAVE_COUNT && (self.active_slaves >> slave) & 1 == 1
    }
}

/// 解析一个遥测数据报
///
/// # 错误
/// - `ProtocolError::InvalidLength`: 长度不等于 132 字节
pub fn decode_telemetry(bytes: &[u8]) -> Result<TelemetryFrame, ProtocolError> {
    if bytes.len() != TELEMETRY_FRAME_SIZE {
        return Err(ProtocolError::InvalidLength {
            expected: TELEMETRY_FRAME_SIZE,
            actual: bytes.len(),
        });
    }

    let mut raw = [0i32; TELEMETRY_WORDS];
    for (word, chunk) in raw.iter_mut().zip(bytes.chunks_exact(4)) {
        *word = i32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    Ok(TelemetryFrame::from_words(raw))
}

#[cfg(feature = "serde")]
mod raw_words {
    use super::TELEMETRY_WORDS;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(raw: &[i32; TELEMETRY_WORDS], s: S) -> Result<S::Ok, S::Error> {
        raw.as_slice().serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[i32; TELEMETRY_WORDS], D::Error> {
        let v = Vec::<i32>::deserialize(d)?;
        let len = v.len();
        v.try_into().map_err(|_| {
            serde::de::Error::invalid_length(len, &"33 telemetry words")
        })
    }
}

//! 输入验证模块
//!
//! 在连接驱动器之前检查命令行给出的设定值。

use anyhow::Result;

/// 扭矩取值上限（1000 = 100%）
pub const MAX_TORQUE: i32 = 1000;

/// 验证扭矩限幅（0–1000）
pub fn validate_torque_limit(torque: i32) -> Result<()> {
    if !(0..=MAX_TORQUE).contains(&torque) {
        anyhow::bail!("Torque limit {} out of range [0, {}]", torque, MAX_TORQUE);
    }
    Ok(())
}

/// 验证扭矩设定值（扭矩模式，符号表示方向）
pub fn validate_torque_setpoint(torque: i32) -> Result<()> {
    if !(-MAX_TORQUE..=MAX_TORQUE).contains(&torque) {
        anyhow::bail!(
            "Torque setpoint {} out of range [{}, {}]",
            torque,
            -MAX_TORQUE,
            MAX_TORQUE
        );
    }
    Ok(())
}

/// 验证目标位置（度）
///
/// 编码后（×10）必须能放入 `i32`。
pub fn validate_position(position_deg: f64) -> Result<()> {
    if !position_deg.is_finite() {
        anyhow::bail!("Position must be a finite number, got {}", position_deg);
    }
    let encoded = (position_deg * 10.0).round();
    if encoded < f64::from(i32::MIN) || encoded > f64::from(i32::MAX) {
        anyhow::bail!("Position {}° is out of the drive's range", position_deg);
    }
    Ok(())
}

/// 验证加减速斜坡（非负）
pub fn validate_ramp(name: &str, ramp: i32) -> Result<()> {
    if ramp < 0 {
        anyhow::bail!("{} must not be negative, got {}", name, ramp);
    }
    Ok(())
}

/// 验证监控频率（1–1000 Hz）
pub fn validate_frequency(frequency: u32) -> Result<()> {
    if !(1..=1000).contains(&frequency) {
        anyhow::bail!("Frequency {} Hz out of range [1, 1000]", frequency);
    }
    Ok(())
}

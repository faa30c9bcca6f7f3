//! 移动命令
//!
//! 位置模式下移动到绝对角度，等待一段时间后打印遥测位置。
//! 会话在命令结束时关闭，驱动器随之失能。

use crate::commands::print_latest_position;
use crate::connection::ConnectionArgs;
use crate::validation::{validate_position, validate_ramp, validate_torque_limit};
use anyhow::Result;
use clap::Args;
use hdrive_sdk::MotionDefaults;
use std::thread;
use std::time::Duration;

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标位置（度）
    #[arg(allow_hyphen_values = true)]
    pub position: f64,

    /// 速度
    #[arg(long, default_value_t = MotionDefaults::MOVE_SPEED)]
    pub speed: i32,

    /// 扭矩限幅（0–1000）
    #[arg(long, default_value_t = MotionDefaults::TORQUE_LIMIT)]
    pub torque: i32,

    /// 加速斜坡
    #[arg(long, default_value_t = MotionDefaults::RAMP)]
    pub acc: i32,

    /// 减速斜坡
    #[arg(long, default_value_t = MotionDefaults::RAMP)]
    pub decc: i32,

    /// 发送后等待时间（毫秒）
    #[arg(long, default_value_t = 2000)]
    pub wait_ms: u64,
}

impl MoveCommand {
    pub fn validate(&self) -> Result<()> {
        validate_position(self.position)?;
        validate_torque_limit(self.torque)?;
        validate_ramp("acc", self.acc)?;
        validate_ramp("decc", self.decc)?;
        Ok(())
    }

    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        self.validate()?;
        let session = connection.connect()?;

        println!(
            "📡 Moving to {:.1}° (speed {}, torque {}) ...",
            self.position, self.speed, self.torque
        );
        session.move_to(self.position, self.speed, self.torque, self.acc, self.decc)?;

        thread::sleep(Duration::from_millis(self.wait_ms));
        print_latest_position(&session);

        println!("✅ Move finished");
        Ok(())
    }
}

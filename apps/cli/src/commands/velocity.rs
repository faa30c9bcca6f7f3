//! 速度模式命令

use crate::commands::print_latest_position;
use crate::connection::ConnectionArgs;
use crate::validation::{validate_ramp, validate_torque_limit};
use anyhow::Result;
use clap::Args;
use hdrive_sdk::MotionDefaults;
use std::thread;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct VelocityCommand {
    /// 目标速度（符号表示方向）
    #[arg(allow_hyphen_values = true)]
    pub speed: i32,

    /// 扭矩限幅（0–1000）
    #[arg(long, default_value_t = 300)]
    pub torque: i32,

    /// 加速斜坡
    #[arg(long, default_value_t = MotionDefaults::RAMP)]
    pub acc: i32,

    /// 减速斜坡
    #[arg(long, default_value_t = MotionDefaults::RAMP)]
    pub decc: i32,

    /// 运行时间（毫秒），结束后停止
    #[arg(long, default_value_t = 3000)]
    pub duration_ms: u64,
}

impl VelocityCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        validate_torque_limit(self.torque)?;
        validate_ramp("acc", self.acc)?;
        validate_ramp("decc", self.decc)?;
        let session = connection.connect()?;

        println!("📡 Running at speed {} for {} ms ...", self.speed, self.duration_ms);
        session.set_speed(self.speed, self.torque, self.acc, self.decc)?;
        thread::sleep(Duration::from_millis(self.duration_ms));
        print_latest_position(&session);

        session.stop()?;
        println!("✅ Stopped");
        Ok(())
    }
}

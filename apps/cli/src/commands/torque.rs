//! 扭矩模式命令

use crate::commands::print_latest_position;
use crate::connection::ConnectionArgs;
use crate::validation::validate_torque_setpoint;
use anyhow::Result;
use clap::Args;
use hdrive_sdk::MotionDefaults;
use std::thread;
use std::time::Duration;

#[derive(Args, Debug)]
pub struct TorqueCommand {
    /// 扭矩设定值（-1000–1000）
    #[arg(allow_hyphen_values = true)]
    pub torque: i32,

    /// 运行时间（毫秒），结束后停止
    #[arg(long, default_value_t = 3000)]
    pub duration_ms: u64,
}

impl TorqueCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        validate_torque_setpoint(self.torque)?;
        let session = connection.connect()?;

        println!("📡 Applying torque {} for {} ms ...", self.torque, self.duration_ms);
        session.set_torque(
            self.torque,
            MotionDefaults::TORQUE_RAMP,
            MotionDefaults::TORQUE_RAMP,
        )?;
        thread::sleep(Duration::from_millis(self.duration_ms));
        print_latest_position(&session);

        session.stop()?;
        println!("✅ Stopped");
        Ok(())
    }
}

//! 停止命令
//!
//! 发送失能命令（mode=0, torque=0），电机自由转动。

use crate::connection::ConnectionArgs;
use anyhow::Result;
use clap::Args;

/// 停止命令参数（只使用全局连接参数）
#[derive(Args, Debug)]
pub struct StopCommand {}

impl StopCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        let session = connection.connect()?;

        println!("🛑 Sending stop command ...");
        session.stop()?;

        println!("✅ Stopped");
        Ok(())
    }
}

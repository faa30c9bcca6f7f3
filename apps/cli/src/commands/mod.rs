//! 命令定义和实现

pub mod monitor;
pub mod r#move;
pub mod object;
pub mod stop;
pub mod stress;
pub mod torque;
pub mod velocity;

pub use monitor::MonitorCommand;
pub use r#move::MoveCommand;
pub use object::{ReadCommand, WriteCommand};
pub use stop::StopCommand;
pub use stress::StressCommand;
pub use torque::TorqueCommand;
pub use velocity::VelocityCommand;

use hdrive_sdk::DriveSession;

/// 打印最新遥测帧的位置与速度（尚未收到时提示）
pub(crate) fn print_latest_position(session: &DriveSession) {
    match session.latest_telemetry() {
        Some(frame) => println!(
            "📊 Position: {} ({:.1}°)  Velocity: {}",
            frame.position,
            f64::from(frame.position) / 10.0,
            frame.velocity
        ),
        None => println!("⚠️  No telemetry received"),
    }
}

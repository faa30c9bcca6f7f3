//! 遥测监控命令
//!
//! 按固定频率打印最新遥测帧，Ctrl+C 或到达时长后结束。

use crate::connection::ConnectionArgs;
use crate::validation::validate_frequency;
use anyhow::{Context, Result};
use clap::Args;
use hdrive_sdk::TelemetryFrame;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Args, Debug)]
pub struct MonitorCommand {
    /// 更新频率（Hz）
    #[arg(short, long, default_value_t = 10)]
    pub frequency: u32,

    /// 监控时长（秒），省略时直到 Ctrl+C
    #[arg(long)]
    pub duration_s: Option<u64>,
}

impl MonitorCommand {
    pub fn execute(&self, connection: &ConnectionArgs) -> Result<()> {
        validate_frequency(self.frequency)?;
        let session = connection.connect()?;

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("Failed to install Ctrl+C handler")?;

        println!("📊 Monitoring ({} Hz, UDP port {}) ...", self.frequency, session.udp_port());
        println!("Press Ctrl+C to stop\n");

        let interval = Duration::from_secs(1) / self.frequency;
        let deadline = self.duration_s.map(|s| Instant::now() + Duration::from_secs(s));
        let mut last_time = None;

        while running.load(Ordering::SeqCst) && deadline.is_none_or(|d| Instant::now() < d) {
            match session.latest_telemetry() {
                Some(frame) if last_time != Some(frame.time_us) => {
                    last_time = Some(frame.time_us);
                    println!("{}", format_frame(&frame));
                },
                Some(_) => {},
                None => println!("  (waiting for telemetry)"),
            }
            thread::sleep(interval);
        }

        let metrics = session.telemetry_metrics();
        println!(
            "\n✅ Monitoring finished: {} packets received, {} dropped",
            metrics.packets_received, metrics.packets_dropped
        );
        Ok(())
    }
}

/// 单行遥测输出
fn format_frame(frame: &TelemetryFrame) -> String {
    format!(
        "  time: {:>10} us  pos: {:>7}  vel: {:>6}  torque: {:>5}  temp: {:>5.1}°C  mode: {:>3}  err: {}",
        frame.time_us,
        frame.position,
        frame.velocity,
        frame.demanded_torque,
        frame.temperature_celsius(),
        frame.motor_mode,
        frame.last_error,
    )
}

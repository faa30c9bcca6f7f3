//! # HDrive CLI
//!
//! Command-line interface for HDrive17-ETH servo drives.
//!
//! 每个子命令独立完成"连接 -> 执行 -> 断开"，退出时驱动器自动失能。
//!
//! ```bash
//! # 读取 UDP 端口对象 m4s17
//! hdrive-cli --ip 192.168.122.102 read 4 17
//!
//! # 以 300 的速度移动到 90°
//! hdrive-cli move 90 --speed 300
//!
//! # 打印遥测，Ctrl+C 结束
//! hdrive-cli monitor --frequency 20
//!
//! # 对象读写压力测试
//! hdrive-cli stress --reads 500 --writes 200 --delay-ms 0
//! ```
//!
//! 连接参数可以来自 `--config` 指定的 TOML 文件，命令行参数优先。

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod connection;
mod validation;

use commands::{
    MonitorCommand, MoveCommand, ReadCommand, StopCommand, StressCommand, TorqueCommand,
    VelocityCommand, WriteCommand,
};
use connection::ConnectionArgs;

/// HDrive CLI - 伺服驱动器命令行工具
#[derive(Parser, Debug)]
#[command(name = "hdrive-cli")]
#[command(about = "Command-line interface for HDrive17-ETH servo drives", long_about = None)]
#[command(version)]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 读取对象
    Read(ReadCommand),

    /// 写入对象
    Write(WriteCommand),

    /// 位置模式：移动到目标角度
    Move(MoveCommand),

    /// 速度模式
    Velocity(VelocityCommand),

    /// 扭矩模式
    Torque(TorqueCommand),

    /// 停止电机
    Stop(StopCommand),

    /// 监控遥测
    Monitor(MonitorCommand),

    /// 对象读写压力测试
    Stress(StressCommand),
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("hdrive_cli=info".parse()?))
        .init();

    let cli = Cli::parse();
    let connection = &cli.connection;

    match &cli.command {
        Commands::Read(args) => args.execute(connection),
        Commands::Write(args) => args.execute(connection),
        Commands::Move(args) => args.execute(connection),
        Commands::Velocity(args) => args.execute(connection),
        Commands::Torque(args) => args.execute(connection),
        Commands::Stop(args) => args.execute(connection),
        Commands::Monitor(args) => args.execute(connection),
        Commands::Stress(args) => args.execute(connection),
    }
}

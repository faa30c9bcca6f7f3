//! 连接参数
//!
//! 所有子命令共用：配置文件提供基础值，命令行参数覆盖。

use anyhow::{Context, Result};
use clap::Args;
use hdrive_sdk::{DriveSession, SessionConfig};
use std::path::PathBuf;

#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// 驱动器 IP（默认 192.168.122.102）
    #[arg(long, global = true)]
    pub ip: Option<String>,

    /// TCP 命令端口（默认 1000）
    #[arg(long, global = true)]
    pub tcp_port: Option<u16>,

    /// UDP 遥测端口（默认从驱动器读取 m4s17）
    #[arg(long, global = true)]
    pub udp_port: Option<u16>,

    /// TOML 配置文件
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

impl ConnectionArgs {
    /// 合并配置文件与命令行参数
    pub fn session_config(&self) -> Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(ip) = &self.ip {
            config.ip = ip.clone();
        }
        if let Some(port) = self.tcp_port {
            config.tcp_port = port;
        }
        if self.udp_port.is_some() {
            config.udp_port = self.udp_port;
        }

        config.validate()?;
        Ok(config)
    }

    /// 连接并完成握手
    pub fn connect(&self) -> Result<DriveSession> {
        let config = self.session_config()?;
        println!("🔌 Connecting to HDrive at {}:{} ...", config.ip, config.tcp_port);

        let session = DriveSession::new(config)?;
        session.connect()?;

        match session.firmware_version() {
            Some(version) => println!("✅ Connected (firmware {version})"),
            None => println!("✅ Connected"),
        }
        Ok(session)
    }
}

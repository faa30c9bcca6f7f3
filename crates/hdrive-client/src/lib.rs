//! 客户端接口模块
//!
//! 本模块提供 HDrive17-ETH 伺服驱动器的会话级接口：
//! - [`DriveSession`]：连接握手、运动命令、对象读写、遥测访问
//! - [`HDriveBuilder`]：链式构造
//! - [`SessionConfig`]：可从 TOML 加载的会话配置
//!
//! # 使用场景
//!
//! 这是大多数用户应该使用的模块。如果需要自定义传输或单独使用命令通道/遥测接收，
//! 可以直接使用 `hdrive-driver`。

pub mod builder;
pub mod config;
mod error;
pub mod session;

pub use builder::HDriveBuilder;
pub use config::{DEFAULT_IP, SessionConfig};
pub use error::HDriveError;
pub use session::{DriveSession, MotionDefaults};

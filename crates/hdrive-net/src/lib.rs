//! # HDrive Net Transport Layer
//!
//! 网络传输抽象层：TCP 命令通道与 UDP 遥测通道。
//!
//! - [`CommandTransport`] / [`TransportConnector`]：命令通道（可重连）
//! - [`DatagramSource`]：遥测数据报来源
//!
//! 驱动层只依赖这些 trait，测试可以注入 Mock 实现（例如记录所有写入字节的传输）。

use std::io;
use std::net::{SocketAddr, ToSocketAddrs};
use thiserror::Error;

pub mod tcp;
pub mod udp;

pub use tcp::{TcpConnector, TcpTransport};
pub use udp::UdpTelemetrySocket;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum NetError {
    #[error("IO Error: {0}")]
    Io(#[from] io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Connection closed by peer")]
    Closed,
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}

impl NetError {
    /// 将 IO 错误归类（超时类错误映射为 `Timeout`）
    pub fn from_io(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => NetError::Timeout,
            _ => NetError::Io(err),
        }
    }

    /// 是否为超时
    pub fn is_timeout(&self) -> bool {
        matches!(self, NetError::Timeout)
    }
}

/// 命令通道传输（一条已建立的连接）
pub trait CommandTransport: Send {
    /// 写入全部字节
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), NetError>;

    /// 接收数据（阻塞，受读超时限制）
    ///
    /// 返回 `Ok(0)` 表示对端已关闭连接；超时返回 `NetError::Timeout`。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, NetError>;

    /// 关闭连接（尽力而为）
    fn shutdown(&mut self) {}
}

/// 命令通道连接器
///
/// 持有连接参数，每次调用 [`connect`](TransportConnector::connect) 建立一条新连接。
/// 命令通道在重连时再次调用它。
pub trait TransportConnector: Send + Sync {
    type Transport: CommandTransport + 'static;

    fn connect(&self) -> Result<Self::Transport, NetError>;

    /// 人类可读的对端描述（用于日志与错误信息）
    fn peer(&self) -> String;
}

/// 遥测数据报来源
pub trait DatagramSource: Send {
    /// 接收一个数据报，返回长度与来源地址
    ///
    /// 在轮询间隔内没有数据时返回 `NetError::Timeout`。
    fn receive(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError>;
}

/// 解析 `host:port`（支持主机名）
pub fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| NetError::InvalidAddress(format!("{host}:{port} ({e})")))?
        .next()
        .ok_or_else(|| NetError::InvalidAddress(format!("{host}:{port}")))
}

//! TCP 命令通道传输
//!
//! 连接参数：`TCP_NODELAY`（禁用 Nagle），有界的连接/读/写超时。

use crate::{CommandTransport, NetError, TransportConnector, resolve};
use std::io::{Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;
use tracing::trace;

/// 默认 IO 超时
pub const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(5);

/// 一条 TCP 命令连接
#[derive(Debug)]
pub struct TcpTransport {
    stream: TcpStream,
}

impl TcpTransport {
    /// 建立连接
    pub fn connect(addr: SocketAddr, timeout: Duration) -> Result<Self, NetError> {
        let stream = TcpStream::connect_timeout(&addr, timeout)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;
        trace!("TCP connected to {}", addr);
        Ok(Self { stream })
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.stream.peer_addr().ok()
    }
}

impl CommandTransport for TcpTransport {
    fn send_all(&mut self, bytes: &[u8]) -> Result<(), NetError> {
        self.stream.write_all(bytes).map_err(NetError::from_io)?;
        self.stream.flush().map_err(NetError::from_io)
    }

    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, NetError> {
        self.stream.read(buf).map_err(NetError::from_io)
    }

    fn shutdown(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// TCP 连接器
///
/// 地址在构造时解析一次；重连复用同一地址。
#[derive(Debug, Clone)]
pub struct TcpConnector {
    addr: SocketAddr,
    timeout: Duration,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr, timeout: Duration) -> Self {
        Self { addr, timeout }
    }

    /// 从主机名/IP 与端口构造
    pub fn resolve(host: &str, port: u16, timeout: Duration) -> Result<Self, NetError> {
        Ok(Self::new(resolve(host, port)?, timeout))
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl TransportConnector for TcpConnector {
    type Transport = TcpTransport;

    fn connect(&self) -> Result<TcpTransport, NetError> {
        TcpTransport::connect(self.addr, self.timeout)
    }

    fn peer(&self) -> String {
        self.addr.to_string()
    }
}

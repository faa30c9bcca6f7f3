//! UDP 遥测 socket
//!
//! 绑定 `0.0.0.0:port`，启用地址复用，读超时即轮询间隔，
//! 使接收线程能够及时观察到停止信号。

use crate::{DatagramSource, NetError};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::Duration;

/// 遥测接收 socket
#[derive(Debug)]
pub struct UdpTelemetrySocket {
    socket: UdpSocket,
}

impl UdpTelemetrySocket {
    /// 绑定遥测端口
    ///
    /// # 参数
    /// - `port`: 本地 UDP 端口（0 表示由系统分配）
    /// - `poll_interval`: 读超时（轮询间隔）
    pub fn bind(port: u16, poll_interval: Duration) -> Result<Self, NetError> {
        let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
        socket.set_reuse_address(true)?;
        socket.set_read_timeout(Some(poll_interval))?;

        let addr = SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, port));
        socket.bind(&SockAddr::from(addr))?;

        Ok(Self {
            socket: socket.into(),
        })
    }

    /// 实际绑定的本地地址
    pub fn local_addr(&self) -> Result<SocketAddr, NetError> {
        Ok(self.socket.local_addr()?)
    }
}

impl DatagramSource for UdpTelemetrySocket {
    fn receive(&mut self, buf: &mut [u8]) -> Result<(usize, SocketAddr), NetError> {
        self.socket.recv_from(buf).map_err(NetError::from_io)
    }
}

//! UDP 实现

use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::debug;

use super::{DatagramSink, DatagramSource};
use crate::error::{SetupError, TransportError};

/// 已 connect 到目标地址的 UDP 发送端。
#[derive(Debug)]
pub struct UdpSink {
    socket: UdpSocket,
}

impl UdpSink {
    pub fn connect(bind: SocketAddr, target: SocketAddr) -> Result<Self, SetupError> {
        let socket = UdpSocket::bind(bind).map_err(|source| SetupError::Bind { addr: bind, source })?;
        socket.connect(target).map_err(|source| SetupError::Connect {
            addr: target,
            source,
        })?;
        debug!(local = ?socket.local_addr().ok(), %target, "UDP 发送端就绪");
        Ok(Self { socket })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }
}

impl DatagramSink for UdpSink {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
        let sent = self.socket.send(datagram).map_err(TransportError::Send)?;
        if sent != datagram.len() {
            return Err(TransportError::ShortSend {
                sent,
                expected: datagram.len(),
            });
        }
        Ok(sent)
    }
}

/// 绑定在监听地址上的 UDP 接收端。
#[derive(Debug)]
pub struct UdpSource {
    socket: UdpSocket,
    // 当前生效的读超时
    timeout: Option<Duration>,
}

impl UdpSource {
    pub fn bind(addr: SocketAddr) -> Result<Self, SetupError> {
        let socket = UdpSocket::bind(addr).map_err(|source| SetupError::Bind { addr, source })?;
        debug!(local = ?socket.local_addr().ok(), "UDP 接收端就绪");
        Ok(Self {
            socket,
            timeout: None,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// 能送达本 socket 的地址，用于发送唤醒用的空数据报。
    pub fn wake_addr(&self) -> io::Result<SocketAddr> {
        self.local_addr().map(wake_target)
    }
}

/// 绑定在通配地址上时改用同协议族的环回地址，否则就是绑定地址本身。
pub fn wake_target(local: SocketAddr) -> SocketAddr {
    let ip = match local.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, local.port())
}

/// 向 `to` 发送一个空数据报，唤醒阻塞在无超时接收上的 socket。
pub fn send_wake(to: SocketAddr) -> io::Result<()> {
    let any: IpAddr = match to {
        SocketAddr::V4(_) => Ipv4Addr::UNSPECIFIED.into(),
        SocketAddr::V6(_) => Ipv6Addr::UNSPECIFIED.into(),
    };
    UdpSocket::bind((any, 0))?.send_to(&[], to)?;
    Ok(())
}

impl DatagramSource for UdpSource {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<Option<usize>, TransportError> {
        // 零时长超时会被 set_read_timeout 拒绝
        let timeout = timeout.map(|d| d.max(Duration::from_millis(1)));
        if timeout != self.timeout {
            self.socket
                .set_read_timeout(timeout)
                .map_err(TransportError::Recv)?;
            self.timeout = timeout;
        }
        match self.socket.recv(buf) {
            Ok(n) => Ok(Some(n)),
            Err(e) if matches!(e.kind(), io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut) => {
                Ok(None)
            }
            Err(e) => Err(TransportError::Recv(e)),
        }
    }
}

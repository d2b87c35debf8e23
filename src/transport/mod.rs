//! 数据报传输层
//!
//! 核心逻辑只依赖 `DatagramSink` / `DatagramSource` 两个 trait；
//! `udp` 子模块提供基于 `std::net::UdpSocket` 的实现。

mod udp;

pub use udp::{UdpSink, UdpSource, send_wake, wake_target};

use std::time::Duration;

use crate::error::TransportError;

/// 发送端：把一个完整数据报交给传输层。
pub trait DatagramSink: Send {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError>;
}

/// 接收端：读取一个数据报。
pub trait DatagramSource: Send {
    /// `timeout` 为 `None` 时无限期阻塞；超时返回 `Ok(None)`。
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<Option<usize>, TransportError>;
}

impl<T: DatagramSink + ?Sized> DatagramSink for Box<T> {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
        (**self).send(datagram)
    }
}

impl<T: DatagramSource + ?Sized> DatagramSource for Box<T> {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<Option<usize>, TransportError> {
        (**self).recv(buf, timeout)
    }
}

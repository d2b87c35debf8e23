mod ack_listener;
mod receiver;

use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::TransportError;
use crate::transport::{DatagramSink, DatagramSource};

/// 记录所有发出的数据报
#[derive(Debug, Clone, Default)]
pub(crate) struct RecordingSink {
    pub sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn datagrams(&self) -> Vec<Vec<u8>> {
        self.sent.lock().expect("sink lock").clone()
    }
}

impl DatagramSink for RecordingSink {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
        self.sent.lock().expect("sink lock").push(datagram.to_vec());
        Ok(datagram.len())
    }
}

/// 按脚本失败：`fail_on` 中列出的第 n 次发送（从 0 计）返回错误
#[derive(Debug, Default)]
pub(crate) struct FlakySink {
    pub attempts: usize,
    pub fail_on: Vec<usize>,
    pub delivered: usize,
}

impl DatagramSink for FlakySink {
    fn send(&mut self, datagram: &[u8]) -> Result<usize, TransportError> {
        let n = self.attempts;
        self.attempts += 1;
        if self.fail_on.contains(&n) {
            return Err(TransportError::Send(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted failure",
            )));
        }
        self.delivered += 1;
        Ok(datagram.len())
    }
}

/// 从 channel 读取数据报的接收端
pub(crate) struct ChannelSource {
    pub rx: Receiver<Vec<u8>>,
}

impl DatagramSource for ChannelSource {
    fn recv(
        &mut self,
        buf: &mut [u8],
        timeout: Option<Duration>,
    ) -> Result<Option<usize>, TransportError> {
        let msg = match timeout {
            Some(t) => match self.rx.recv_timeout(t) {
                Ok(msg) => msg,
                Err(RecvTimeoutError::Timeout) => return Ok(None),
                Err(RecvTimeoutError::Disconnected) => {
                    // 发送方已关闭：按超时处理
                    std::thread::sleep(t);
                    return Ok(None);
                }
            },
            None => match self.rx.recv() {
                Ok(msg) => msg,
                Err(_) => {
                    return Err(TransportError::Recv(io::Error::new(
                        io::ErrorKind::BrokenPipe,
                        "channel closed",
                    )));
                }
            },
        };
        let n = msg.len().min(buf.len());
        buf[..n].copy_from_slice(&msg[..n]);
        Ok(Some(n))
    }
}

//! 数据包类型
//!
//! 定义发送端构造的数据包及接收端的头部解析。

use super::{HEADER_SIZE, SENTINEL};
use crate::time::Timestamp;

/// 发送端的一个数据包。
#[derive(Debug, Clone)]
pub struct DataPacket {
    pub seq: u64,
    pub size_bytes: usize,
    pub sent_at: Timestamp,
}

impl DataPacket {
    pub fn new(seq: u64, size_bytes: usize, sent_at: Timestamp) -> Self {
        Self {
            seq,
            size_bytes,
            sent_at,
        }
    }

    /// 编码到 `buf`（复用缓冲区，避免每包分配）。
    ///
    /// `size_bytes` 小于 `HEADER_SIZE` 时仍写完整头部。
    pub fn encode_into(&self, buf: &mut Vec<u8>) {
        let size = self.size_bytes.max(HEADER_SIZE);
        buf.clear();
        buf.extend_from_slice(&self.seq.to_be_bytes());
        buf.resize(size, SENTINEL);
    }
}

/// 从数据报中读取序列号头部；不足 `HEADER_SIZE` 字节时返回 `None`。
pub fn decode_seq(datagram: &[u8]) -> Option<u64> {
    let header: [u8; HEADER_SIZE] = datagram.get(..HEADER_SIZE)?.try_into().ok()?;
    Some(u64::from_be_bytes(header))
}

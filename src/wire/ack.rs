//! ACK 编解码

use super::HEADER_SIZE;

pub fn encode_ack(seq: u64) -> [u8; HEADER_SIZE] {
    seq.to_be_bytes()
}

/// 只接受长度恰好为 `HEADER_SIZE` 的消息，其余一律视为无效。
pub fn decode_ack(msg: &[u8]) -> Option<u64> {
    let header: [u8; HEADER_SIZE] = msg.try_into().ok()?;
    Some(u64::from_be_bytes(header))
}

//! 线上格式
//!
//! 数据包：`[0, HEADER_SIZE)` 为大端序列号，其余字节为哨兵填充，总长 `packet_size`。
//! ACK：恰好 `HEADER_SIZE` 字节，编码与数据包头相同。

mod ack;
mod packet;

pub use ack::{decode_ack, encode_ack};
pub use packet::{DataPacket, decode_seq};

/// 序列号头部长度（字节）。
pub const HEADER_SIZE: usize = 8;

/// 默认数据包大小（字节）。
pub const PACKET_SIZE: usize = 1500;

/// 负载填充字节。
pub const SENTINEL: u8 = b'X';

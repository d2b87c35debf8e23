//! 数据包发送器
//!
//! 构造数据包、先登记账本再交给传输层。

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::ledger::DeliveryLedger;
use crate::stats::ThroughputWindow;
use crate::time::Timestamp;
use crate::transport::DatagramSink;
use crate::wire::DataPacket;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct TransmitStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}

#[derive(Debug)]
pub struct Transmitter<S> {
    sink: S,
    ledger: Arc<DeliveryLedger>,
    packet_size: usize,
    next_seq: u64,
    buf: Vec<u8>,
    stats: TransmitStats,
    window: ThroughputWindow,
}

impl<S: DatagramSink> Transmitter<S> {
    pub fn new(
        sink: S,
        ledger: Arc<DeliveryLedger>,
        packet_size: usize,
        window: Duration,
    ) -> Self {
        Self {
            sink,
            ledger,
            packet_size,
            next_seq: 0,
            buf: Vec::with_capacity(packet_size),
            stats: TransmitStats::default(),
            window: ThroughputWindow::new(Timestamp::ZERO, window),
        }
    }

    /// 分配下一个序列号并发送。序列号在失败时同样被消耗，绝不复用。
    pub fn send_next(&mut self, now: Timestamp) -> Result<u64, TransportError> {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.transmit(seq, now)?;
        Ok(seq)
    }

    fn transmit(&mut self, seq: u64, now: Timestamp) -> Result<(), TransportError> {
        DataPacket::new(seq, self.packet_size, now).encode_into(&mut self.buf);
        let bytes = self.buf.len() as u64;

        // 先登记再发送：ACK 处理时条目一定可见
        self.ledger.insert(seq, bytes, now);
        if let Err(e) = self.sink.send(&self.buf) {
            self.ledger.discard(seq);
            self.stats.send_failures = self.stats.send_failures.saturating_add(1);
            debug!(seq, error = %e, "发送失败");
            return Err(e);
        }

        self.stats.packets_sent = self.stats.packets_sent.saturating_add(1);
        self.stats.bytes_sent = self.stats.bytes_sent.saturating_add(bytes);
        self.window.add(bytes);
        trace!(seq, bytes, now = ?now, "数据包已发送");
        Ok(())
    }

    pub fn packet_size(&self) -> usize {
        self.packet_size
    }

    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    pub fn stats(&self) -> TransmitStats {
        self.stats
    }

    pub fn window_mut(&mut self) -> &mut ThroughputWindow {
        &mut self.window
    }
}

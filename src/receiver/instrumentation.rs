use std::time::Duration;

use serde::Serialize;

use crate::report::ReceiverRecord;
use crate::stats::{ThroughputWindow, throughput_bps};
use crate::time::Timestamp;
use crate::wire::decode_seq;

/// 一次到达
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    pub at: Timestamp,
    pub seq: Option<u64>,
    pub size_bytes: usize,
    pub inter_arrival: Duration,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReceiverSummary {
    pub packets: u64,
    pub total_bytes: u64,
    pub elapsed_ms: f64,
    pub average_bps: f64,
}

/// 接收端统计状态机，不做任何 I/O。
#[derive(Debug)]
pub struct ReceiverInstrumentation {
    started_at: Timestamp,
    // 第一个包的到达间隔从开始监听时算起
    last_receive: Timestamp,
    window: ThroughputWindow,
    total_bytes: u64,
    packets: u64,
}

impl ReceiverInstrumentation {
    pub fn new(started_at: Timestamp, window: Duration) -> Self {
        Self {
            started_at,
            last_receive: started_at,
            window: ThroughputWindow::new(started_at, window),
            total_bytes: 0,
            packets: 0,
        }
    }

    /// 处理一个到达的数据报。窗口到期时返回包详情与吞吐两条记录，并重置窗口。
    pub fn on_datagram(
        &mut self,
        now: Timestamp,
        datagram: &[u8],
    ) -> (Arrival, Option<[ReceiverRecord; 2]>) {
        let arrival = Arrival {
            at: now,
            seq: decode_seq(datagram),
            size_bytes: datagram.len(),
            inter_arrival: now.saturating_since(self.last_receive),
        };
        self.last_receive = now;
        let bytes = datagram.len() as u64;
        self.window.add(bytes);
        self.total_bytes = self.total_bytes.saturating_add(bytes);
        self.packets += 1;

        let records = self.window.roll(now).map(|sample| {
            let t_ms = now.saturating_since(self.started_at).as_secs_f64() * 1_000.0;
            [
                ReceiverRecord::Packet {
                    t_ms,
                    seq: arrival.seq,
                    size_bytes: arrival.size_bytes,
                    inter_arrival_ms: arrival.inter_arrival.as_secs_f64() * 1_000.0,
                },
                ReceiverRecord::Throughput {
                    t_ms,
                    bytes: sample.bytes,
                    bps: sample.throughput_bps(),
                },
            ]
        });
        (arrival, records)
    }

    /// 整个运行期间的平均吞吐记录
    pub fn finish(&self, now: Timestamp) -> (ReceiverRecord, ReceiverSummary) {
        let elapsed = now.saturating_since(self.started_at);
        let average_bps = throughput_bps(self.total_bytes, elapsed);
        let summary = ReceiverSummary {
            packets: self.packets,
            total_bytes: self.total_bytes,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            average_bps,
        };
        (ReceiverRecord::Average { bps: average_bps }, summary)
    }

    pub fn packets(&self) -> u64 {
        self.packets
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn window_bytes(&self) -> u64 {
        self.window.bytes()
    }

    pub fn last_receive(&self) -> Timestamp {
        self.last_receive
    }
}

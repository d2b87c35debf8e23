use std::fmt;

/// 接收端记录
#[derive(Debug, Clone, PartialEq)]
pub enum ReceiverRecord {
    Packet {
        t_ms: f64,
        seq: Option<u64>,
        size_bytes: usize,
        inter_arrival_ms: f64,
    },
    Throughput {
        t_ms: f64,
        bytes: u64,
        bps: f64,
    },
    Average { bps: f64 },
}

impl fmt::Display for ReceiverRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReceiverRecord::Packet {
                t_ms,
                seq,
                size_bytes,
                inter_arrival_ms,
            } => {
                write!(f, "[Packet] Time(ms): {t_ms:.3}, Seq Number: ")?;
                match seq {
                    Some(seq) => write!(f, "{seq}")?,
                    None => write!(f, "N/A")?,
                }
                write!(
                    f,
                    ", Packet Size(bytes): {size_bytes}, Inter-arrival Time(ms): {inter_arrival_ms:.3}"
                )
            }
            ReceiverRecord::Throughput { t_ms, bytes, bps } => write!(
                f,
                "[Throughput] Time(ms): {t_ms:.3}, Bytes Received: {bytes}, Throughput(bps): {bps:.2}"
            ),
            ReceiverRecord::Average { bps } => write!(f, "Average Throughput (bps): {bps:.2}"),
        }
    }
}

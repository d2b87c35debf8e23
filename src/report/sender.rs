use std::fmt;
use std::net::SocketAddr;

use crate::config::{ExperimentConfig, Mode};

/// 头部记录中的运行参数
#[derive(Debug, Clone)]
pub struct RunParams {
    pub target: SocketAddr,
    pub mode: Mode,
    pub burst_size: u64,
    pub burst_duration_ms: u64,
    pub inter_burst_ms: u64,
    pub packet_size: usize,
    pub duration_s: u64,
    pub rate_bps: Option<u64>,
    pub ramp: Option<(u64, u64)>,
}

impl From<&ExperimentConfig> for RunParams {
    fn from(cfg: &ExperimentConfig) -> Self {
        Self {
            target: cfg.target,
            mode: cfg.mode,
            burst_size: cfg.burst_size,
            burst_duration_ms: cfg.burst_duration_ms,
            inter_burst_ms: cfg.inter_burst_ms,
            packet_size: cfg.packet_size,
            duration_s: cfg.duration_s,
            rate_bps: cfg.rate_bps,
            ramp: cfg.ramp.map(|r| (r.duration_ms, r.rate_bps)),
        }
    }
}

/// 发送端记录
#[derive(Debug, Clone)]
pub enum SenderRecord {
    Header(RunParams),
    /// 周期性进度：相对运行开始的毫秒数、累计发送字节、累计确认字节
    Progress {
        t_ms: u64,
        total_bytes_sent: u64,
        total_acked_bytes: u64,
    },
    Average { bps: f64 },
}

impl fmt::Display for SenderRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SenderRecord::Header(p) => {
                write!(
                    f,
                    "# target={} mode={} burst_size={} burst_duration_ms={} inter_burst_ms={} packet_size={} duration_s={}",
                    p.target,
                    p.mode,
                    p.burst_size,
                    p.burst_duration_ms,
                    p.inter_burst_ms,
                    p.packet_size,
                    p.duration_s
                )?;
                if let Some(rate) = p.rate_bps {
                    write!(f, " rate_bps={rate}")?;
                }
                match p.ramp {
                    Some((ms, rate)) => write!(f, " ramp_ms={ms} ramp_rate_bps={rate}"),
                    None => write!(f, " ramp=none"),
                }
            }
            SenderRecord::Progress {
                t_ms,
                total_bytes_sent,
                total_acked_bytes,
            } => write!(f, "{t_ms} : {total_bytes_sent} : {total_acked_bytes}"),
            SenderRecord::Average { bps } => write!(f, "Average Throughput (bps): {bps:.2}"),
        }
    }
}

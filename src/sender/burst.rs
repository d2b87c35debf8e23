//! 突发调度器
//!
//! 两状态状态机：
//! - Idle：距上一次突发结束 >= `inter_burst` 时进入 Bursting，清零突发字节数并记录开始时间。
//! - Bursting：突发时长 >= `burst_duration` 时回到 Idle（时长上限）；
//!   否则距上次发送 >= `pacing_interval` 时发送一个包，
//!   发送后突发字节数 >= `burst_size` 则回到 Idle（大小上限）。
//!
//! 两个上限同时生效，先到者结束突发。调度器由主循环轮询驱动，本身从不睡眠。

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use super::Transmitter;
use crate::config::ExperimentConfig;
use crate::time::Timestamp;
use crate::transport::DatagramSink;

/// 突发参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurstParams {
    pub burst_size: u64,
    pub burst_duration: Duration,
    pub inter_burst: Duration,
    pub packet_size: usize,
}

impl BurstParams {
    /// 以平均速率 `burst_size / burst_duration` 发送一个包所需的时间。
    pub fn pacing_interval(&self) -> Duration {
        if self.burst_size == 0 {
            return self.burst_duration;
        }
        let nanos = (self.packet_size as u128).saturating_mul(self.burst_duration.as_nanos())
            / self.burst_size as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// 单次突发最多发送的包数：ceil(burst_size / packet_size)。
    pub fn max_packets_per_burst(&self) -> u64 {
        let pkt = self.packet_size.max(1) as u64;
        self.burst_size.div_ceil(pkt)
    }
}

impl From<&ExperimentConfig> for BurstParams {
    fn from(cfg: &ExperimentConfig) -> Self {
        Self {
            burst_size: cfg.burst_size,
            burst_duration: cfg.burst_duration(),
            inter_burst: cfg.inter_burst(),
            packet_size: cfg.packet_size,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstPhase {
    Idle,
    Bursting,
}

/// 突发结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurstEnd {
    SizeCap,
    DurationCap,
    /// 传输层报错，中止当前突发
    SendFailed,
}

/// 单个 tick 内发生的事
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tick {
    pub started: bool,
    pub sent: Option<u64>,
    pub ended: Option<BurstEnd>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct BurstStats {
    pub bursts_started: u64,
    pub ended_by_size: u64,
    pub ended_by_duration: u64,
    pub aborted: u64,
}

#[derive(Debug)]
pub struct BurstScheduler {
    params: BurstParams,
    phase: BurstPhase,
    burst_bytes_sent: u64,
    burst_start: Timestamp,
    last_burst_end: Timestamp,
    last_send: Option<Timestamp>,
    // 每次进入 Bursting 时从参数计算一次
    pacing_interval: Duration,
    stats: BurstStats,
}

impl BurstScheduler {
    /// 初始为 Idle，第一个突发在 `start + inter_burst` 之后开始。
    pub fn new(params: BurstParams, start: Timestamp) -> Self {
        Self {
            params,
            phase: BurstPhase::Idle,
            burst_bytes_sent: 0,
            burst_start: start,
            last_burst_end: start,
            last_send: None,
            pacing_interval: params.pacing_interval(),
            stats: BurstStats::default(),
        }
    }

    pub fn tick<S: DatagramSink>(&mut self, now: Timestamp, tx: &mut Transmitter<S>) -> Tick {
        let mut tick = Tick::default();

        if self.phase == BurstPhase::Idle {
            if now.saturating_since(self.last_burst_end) < self.params.inter_burst {
                return tick;
            }
            self.enter_burst(now);
            tick.started = true;
        }

        if now.saturating_since(self.burst_start) >= self.params.burst_duration {
            self.end_burst(now, BurstEnd::DurationCap);
            tick.ended = Some(BurstEnd::DurationCap);
            return tick;
        }

        let due = match self.last_send {
            None => true,
            Some(last) => now.saturating_since(last) >= self.pacing_interval,
        };
        if !due {
            return tick;
        }

        match tx.send_next(now) {
            Ok(seq) => {
                self.last_send = Some(now);
                self.burst_bytes_sent = self
                    .burst_bytes_sent
                    .saturating_add(tx.packet_size() as u64);
                tick.sent = Some(seq);
                if self.burst_bytes_sent >= self.params.burst_size {
                    self.end_burst(now, BurstEnd::SizeCap);
                    tick.ended = Some(BurstEnd::SizeCap);
                }
            }
            Err(e) => {
                debug!(error = %e, "发送失败，中止当前突发");
                self.end_burst(now, BurstEnd::SendFailed);
                tick.ended = Some(BurstEnd::SendFailed);
            }
        }
        tick
    }

    fn enter_burst(&mut self, now: Timestamp) {
        self.phase = BurstPhase::Bursting;
        self.burst_bytes_sent = 0;
        self.burst_start = now;
        self.last_send = None;
        self.pacing_interval = self.params.pacing_interval();
        self.stats.bursts_started += 1;
        trace!(now = ?now, pacing = ?self.pacing_interval, "突发开始");
    }

    fn end_burst(&mut self, now: Timestamp, why: BurstEnd) {
        self.phase = BurstPhase::Idle;
        self.last_burst_end = now;
        match why {
            BurstEnd::SizeCap => self.stats.ended_by_size += 1,
            BurstEnd::DurationCap => self.stats.ended_by_duration += 1,
            BurstEnd::SendFailed => self.stats.aborted += 1,
        }
        trace!(
            now = ?now,
            reason = ?why,
            burst_bytes = self.burst_bytes_sent,
            "突发结束"
        );
    }

    pub fn phase(&self) -> BurstPhase {
        self.phase
    }

    pub fn burst_bytes_sent(&self) -> u64 {
        self.burst_bytes_sent
    }

    pub fn pacing_interval(&self) -> Duration {
        self.pacing_interval
    }

    pub fn params(&self) -> &BurstParams {
        &self.params
    }

    pub fn stats(&self) -> BurstStats {
        self.stats
    }
}

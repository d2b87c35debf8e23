//! 恒定速率阶段
//!
//! 没有突发/空闲交替：发一个包，睡眠 `pacing_interval`，直到阶段时长用完。
//! 两种用法：突发模式之前的短暂预热（ramp），以及取代突发模式的 volumetric 模式。

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, trace};

use super::Transmitter;
use crate::signal::StopSignal;
use crate::time::{Clock, Timestamp};
use crate::transport::DatagramSink;

// 单次睡眠的上限：睡眠期间每隔这么久检查一次停止信号
const STOP_POLL: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RateStats {
    pub packets_sent: u64,
    pub retries: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePhase {
    pub rate_bps: u64,
    pub packet_size: usize,
    pub duration: Duration,
}

impl RatePhase {
    pub fn new(rate_bps: u64, packet_size: usize, duration: Duration) -> Self {
        Self {
            rate_bps,
            packet_size,
            duration,
        }
    }

    pub fn packets_per_second(&self) -> f64 {
        self.rate_bps as f64 / (self.packet_size as f64 * 8.0)
    }

    /// 1000 / packets_per_second 毫秒，按整数纳秒计算
    pub fn pacing_interval(&self) -> Duration {
        if self.rate_bps == 0 {
            return self.duration;
        }
        let nanos = (self.packet_size as u128).saturating_mul(8 * 1_000_000_000)
            / self.rate_bps as u128;
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// 运行到阶段时长用完或收到停止信号。
    ///
    /// 两次发送之间的睡眠不会越过阶段结束时刻。
    ///
    /// 发送失败时不睡眠，立即用下一个序列号重试。
    /// `on_tick` 在每次发送尝试之后调用，用于输出进度记录。
    pub fn run<S, C, E>(
        &self,
        tx: &mut Transmitter<S>,
        clock: &C,
        stop: &StopSignal,
        mut on_tick: impl FnMut(Timestamp, &mut Transmitter<S>) -> Result<(), E>,
    ) -> Result<RateStats, E>
    where
        S: DatagramSink,
        C: Clock,
    {
        let interval = self.pacing_interval();
        let start = clock.now();
        let end = start.saturating_add(self.duration);
        let mut stats = RateStats::default();
        debug!(
            rate_bps = self.rate_bps,
            pps = self.packets_per_second(),
            interval = ?interval,
            duration = ?self.duration,
            "恒定速率阶段开始"
        );

        loop {
            if stop.is_cancelled() {
                break;
            }
            let now = clock.now();
            if now >= end {
                break;
            }
            match tx.send_next(now) {
                Ok(_) => {
                    stats.packets_sent += 1;
                    on_tick(now, tx)?;
                    sleep_until_due(clock, stop, interval.min(end.saturating_since(now)));
                }
                Err(e) => {
                    stats.retries += 1;
                    trace!(error = %e, "发送失败，立即重试");
                    on_tick(now, tx)?;
                }
            }
        }

        debug!(packets = stats.packets_sent, retries = stats.retries, "恒定速率阶段结束");
        Ok(stats)
    }
}

/// 分段睡眠 `total`，收到停止信号时提前返回。
fn sleep_until_due<C: Clock>(clock: &C, stop: &StopSignal, total: Duration) {
    let mut left = total;
    while !left.is_zero() && !stop.is_cancelled() {
        let chunk = left.min(STOP_POLL);
        clock.sleep(chunk);
        left -= chunk;
    }
}

use std::time::Duration;

use crate::time::Timestamp;

/// 每秒比特数；`elapsed` 为 0 时返回 0。
pub fn throughput_bps(bytes: u64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs <= 0.0 {
        return 0.0;
    }
    (bytes as f64 * 8.0) / secs
}

/// 一个已结束窗口的结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSample {
    pub at: Timestamp,
    pub bytes: u64,
    pub elapsed: Duration,
}

impl WindowSample {
    pub fn bits(&self) -> u64 {
        self.bytes.saturating_mul(8)
    }

    pub fn throughput_bps(&self) -> f64 {
        throughput_bps(self.bytes, self.elapsed)
    }
}

/// 固定时长的吞吐窗口
#[derive(Debug, Clone)]
pub struct ThroughputWindow {
    start: Timestamp,
    bytes: u64,
    threshold: Duration,
}

impl ThroughputWindow {
    pub fn new(start: Timestamp, threshold: Duration) -> Self {
        Self {
            start,
            bytes: 0,
            threshold,
        }
    }

    pub fn add(&mut self, bytes: u64) {
        self.bytes = self.bytes.saturating_add(bytes);
    }

    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    pub fn elapsed(&self, now: Timestamp) -> Duration {
        now.saturating_since(self.start)
    }

    pub fn is_due(&self, now: Timestamp) -> bool {
        self.elapsed(now) >= self.threshold
    }

    /// 窗口到期时返回结果并从 `now` 开始新窗口；否则返回 `None`。
    pub fn roll(&mut self, now: Timestamp) -> Option<WindowSample> {
        if !self.is_due(now) {
            return None;
        }
        let sample = WindowSample {
            at: now,
            bytes: self.bytes,
            elapsed: self.elapsed(now),
        };
        self.start = now;
        self.bytes = 0;
        Some(sample)
    }

    /// 从 `now` 开始新窗口，丢弃已有计数。
    pub fn reset(&mut self, now: Timestamp) {
        self.start = now;
        self.bytes = 0;
    }
}

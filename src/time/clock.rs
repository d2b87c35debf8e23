//! 时钟源
//!
//! `MonotonicClock` 包装 `std::time::Instant`；`ManualClock` 是确定性的测试时钟，
//! 可在线程间共享（克隆后指向同一计数器）。

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use super::Timestamp;

/// 单调时钟抽象：调度器、传输器与接收端都只通过它读取时间。
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;

    /// 挂起当前线程。
    fn sleep(&self, d: Duration);
}

/// 真实单调时钟，起点为创建时刻。
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Timestamp {
        let nanos = self.origin.elapsed().as_nanos();
        Timestamp(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    fn sleep(&self, d: Duration) {
        std::thread::sleep(d);
    }
}

/// 手动时钟：`sleep` 直接推进时间，不真正阻塞。
///
/// 设置 `step` 后，每次 `now()` 读取也会把时间推进 `step`，
/// 这样轮询循环在测试中也能确定性地向前走。
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
    step: u64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_step(step: Duration) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(0)),
            step: u64::try_from(step.as_nanos()).unwrap_or(u64::MAX),
        }
    }

    pub fn advance(&self, d: Duration) {
        let nanos = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    pub fn set(&self, at: Timestamp) {
        self.nanos.store(at.0, Ordering::SeqCst);
    }

    /// 读取当前时间，不推进。
    pub fn peek(&self) -> Timestamp {
        Timestamp(self.nanos.load(Ordering::SeqCst))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        Timestamp(self.nanos.fetch_add(self.step, Ordering::SeqCst))
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

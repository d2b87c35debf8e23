//! 时间模块
//!
//! 所有调度决策都基于单调时钟。`Clock` 可注入，测试中用 `ManualClock` 取代真实时间。

mod clock;
mod timestamp;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use timestamp::Timestamp;

//! 接收端
//!
//! 单线程：阻塞接收、打时间戳、维护到达间隔与窗口吞吐统计。
//! 与发送端的调度无关，唯一共享的是 `stats::ThroughputWindow` 这套窗口算法。

mod instrumentation;
mod run;

pub use instrumentation::{Arrival, ReceiverInstrumentation, ReceiverSummary};
pub use run::{MAX_RECV_FAILURES, run_receiver};

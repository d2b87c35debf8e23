//! 吞吐窗口统计
//!
//! 发送端与接收端共用同一种窗口：累积字节数，
//! 窗口时长达到阈值时输出一次记录并重置。

mod window;

pub use window::{ThroughputWindow, WindowSample, throughput_bps};

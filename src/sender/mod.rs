//! 发送端
//!
//! 主线程：`BurstScheduler` 轮询时钟并驱动 `Transmitter`（或由 `RatePhase` 按固定速率驱动）。
//! 后台线程：`AckListener` 接收 ACK 并更新共享的 `DeliveryLedger`。
//! `SenderSession` 负责把它们串起来，并在结束时 join 监听线程后再输出最终统计。

mod ack_listener;
mod burst;
mod ramp;
mod session;
mod transmitter;

pub use ack_listener::{AckListener, AckListenerHandle, AckStats};
pub use burst::{BurstEnd, BurstParams, BurstPhase, BurstScheduler, BurstStats, Tick};
pub use ramp::{RatePhase, RateStats};
pub use session::{SenderSession, SenderSummary};
pub use transmitter::{TransmitStats, Transmitter};

//! ACK 监听线程
//!
//! 独立于发送主循环运行：带超时地接收定长 ACK，解码序列号后在账本中移除并计入。
//! 每次接收返回（包括超时）后检查一次停止信号。

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, trace};

use crate::error::{RunError, SetupError};
use crate::ledger::DeliveryLedger;
use crate::signal::StopSignal;
use crate::transport::DatagramSource;
use crate::wire::decode_ack;

// 大于 ACK 长度，超长消息才能被识别出来
const RECV_BUF_BYTES: usize = 64;

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct AckStats {
    pub received: u64,
    pub credited: u64,
    /// 重复或未知序列号
    pub unmatched: u64,
    /// 长度不对，静默丢弃
    pub malformed: u64,
    pub recv_errors: u64,
}

pub struct AckListener<R> {
    source: R,
    ledger: Arc<DeliveryLedger>,
    stop: StopSignal,
    timeout: Duration,
}

impl<R: DatagramSource + 'static> AckListener<R> {
    pub fn new(source: R, ledger: Arc<DeliveryLedger>, stop: StopSignal, timeout: Duration) -> Self {
        Self {
            source,
            ledger,
            stop,
            timeout,
        }
    }

    /// 在后台线程中运行。
    pub fn spawn(self) -> Result<AckListenerHandle, SetupError> {
        let stop = self.stop.clone();
        let handle = thread::Builder::new()
            .name("ack-listener".to_string())
            .spawn(move || self.run())
            .map_err(SetupError::Thread)?;
        Ok(AckListenerHandle { stop, handle })
    }

    /// 阻塞运行直到停止信号被设置。
    pub fn run(mut self) -> AckStats {
        let mut stats = AckStats::default();
        let mut buf = [0u8; RECV_BUF_BYTES];
        debug!(timeout = ?self.timeout, "ACK 监听开始");

        while !self.stop.is_cancelled() {
            match self.source.recv(&mut buf, Some(self.timeout)) {
                Ok(Some(n)) => {
                    let Some(seq) = decode_ack(&buf[..n]) else {
                        stats.malformed += 1;
                        continue;
                    };
                    stats.received += 1;
                    match self.ledger.remove_and_credit(seq) {
                        Some(_) => stats.credited += 1,
                        None => {
                            stats.unmatched += 1;
                            trace!(seq, "重复或未知 ACK");
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    stats.recv_errors += 1;
                    debug!(error = %e, "ACK 接收失败");
                }
            }
        }

        info!(
            received = stats.received,
            credited = stats.credited,
            unmatched = stats.unmatched,
            malformed = stats.malformed,
            "ACK 监听结束"
        );
        stats
    }
}

/// 后台监听线程的句柄；持有者必须在读取最终统计前调用 `stop_and_join`。
pub struct AckListenerHandle {
    stop: StopSignal,
    handle: JoinHandle<AckStats>,
}

impl AckListenerHandle {
    pub fn stop_and_join(self) -> Result<AckStats, RunError> {
        self.stop.cancel();
        self.handle.join().map_err(|_| RunError::ListenerPanicked)
    }
}

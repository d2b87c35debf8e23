//! 接收主循环

use std::io::Write;
use std::time::Duration;

use tracing::{debug, info, trace, warn};

use super::{ReceiverInstrumentation, ReceiverSummary};
use crate::config::ReceiverConfig;
use crate::error::RunError;
use crate::report::RecordLog;
use crate::signal::StopSignal;
use crate::time::Clock;
use crate::transport::{DatagramSink, DatagramSource};
use crate::wire::encode_ack;

const MAX_DATAGRAM: usize = 65_535;
/// 连续接收失败达到该次数后放弃。
pub const MAX_RECV_FAILURES: u32 = 32;
const RECV_BACKOFF_MIN: Duration = Duration::from_millis(1);
const RECV_BACKOFF_MAX: Duration = Duration::from_secs(1);

/// 阻塞接收直到 `max_packets` 达到或停止信号被设置。
///
/// 接收本身没有超时；停止信号在每个数据报到达后检查，
/// 因此外部需要用一个空数据报唤醒阻塞中的接收。空数据报不计入统计。
/// `echo` 非空时，把每个数据包的序列号头作为 ACK 回送。
/// 接收失败时按指数退避重试，连续失败 [`MAX_RECV_FAILURES`] 次返回错误。
pub fn run_receiver<C, R, K, W>(
    cfg: &ReceiverConfig,
    clock: &C,
    source: &mut R,
    mut echo: Option<&mut K>,
    out: W,
    stop: &StopSignal,
) -> Result<(ReceiverSummary, W), RunError>
where
    C: Clock,
    R: DatagramSource,
    K: DatagramSink,
    W: Write,
{
    let mut log = RecordLog::new(out);
    let mut buf = vec![0u8; MAX_DATAGRAM];
    let mut inst = ReceiverInstrumentation::new(clock.now(), cfg.window);
    info!(listen = %cfg.listen, window = ?cfg.window, "▶️  开始接收");
    let mut failures = 0u32;
    let mut backoff = RECV_BACKOFF_MIN;

    loop {
        if cfg.max_packets.is_some_and(|max| inst.packets() >= max) {
            break;
        }
        let n = match source.recv(&mut buf, None) {
            Ok(Some(n)) => n,
            Ok(None) => continue,
            Err(e) => {
                failures += 1;
                if failures >= MAX_RECV_FAILURES {
                    warn!(failures, error = %e, "接收持续失败，放弃");
                    return Err(RunError::RecvFailing { failures, source: e });
                }
                warn!(failures, backoff = ?backoff, error = %e, "接收失败");
                clock.sleep(backoff);
                backoff = (backoff * 2).min(RECV_BACKOFF_MAX);
                if stop.is_cancelled() {
                    break;
                }
                continue;
            }
        };
        failures = 0;
        backoff = RECV_BACKOFF_MIN;
        if stop.is_cancelled() {
            break;
        }
        if n == 0 {
            continue;
        }

        let now = clock.now();
        let (arrival, records) = inst.on_datagram(now, &buf[..n]);
        trace!(seq = ?arrival.seq, bytes = n, inter_arrival = ?arrival.inter_arrival, "收到数据包");
        if let Some(records) = records {
            for record in &records {
                log.write(record)?;
            }
        }

        if let (Some(sink), Some(seq)) = (echo.as_deref_mut(), arrival.seq) {
            if let Err(e) = sink.send(&encode_ack(seq)) {
                debug!(seq, error = %e, "ACK 回送失败");
            }
        }
    }

    let (record, summary) = inst.finish(clock.now());
    log.write(&record)?;
    log.flush()?;
    info!(
        packets = summary.packets,
        bytes = summary.total_bytes,
        average_bps = summary.average_bps,
        "✅ 接收结束"
    );
    Ok((summary, log.into_inner()))
}

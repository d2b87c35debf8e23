//! 发送会话
//!
//! 一次完整运行：头部记录 -> 可选预热 -> 突发模式或 volumetric 模式 -> 停止并 join
//! ACK 监听线程 -> 最终记录。实验时长从会话开始计起，包含预热阶段。

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use super::{AckListenerHandle, AckStats, BurstParams, BurstScheduler, BurstStats};
use super::{RatePhase, RateStats, TransmitStats, Transmitter};
use crate::config::{ExperimentConfig, Mode};
use crate::error::RunError;
use crate::ledger::DeliveryLedger;
use crate::report::{RecordLog, RunParams, SenderRecord};
use crate::signal::StopSignal;
use crate::stats::throughput_bps;
use crate::time::{Clock, Timestamp};
use crate::transport::DatagramSink;

/// 运行结束后的汇总（可序列化为 JSON）
#[derive(Debug, Clone, Serialize)]
pub struct SenderSummary {
    pub mode: Mode,
    pub elapsed_ms: f64,
    pub average_bps: f64,
    pub transmit: TransmitStats,
    pub bursts: Option<BurstStats>,
    pub ramp: Option<RateStats>,
    pub volumetric: Option<RateStats>,
    pub acks: Option<AckStats>,
    pub acked_bytes: u64,
    pub acked_pkts: u64,
    /// 运行结束时仍未确认的条目
    pub outstanding: usize,
    pub outstanding_bytes: u64,
}

pub struct SenderSession<C, S, W: Write> {
    cfg: ExperimentConfig,
    clock: C,
    tx: Transmitter<S>,
    ledger: Arc<DeliveryLedger>,
    log: RecordLog<W>,
    stop: StopSignal,
    listener: Option<AckListenerHandle>,
}

impl<C, S, W> SenderSession<C, S, W>
where
    C: Clock,
    S: DatagramSink,
    W: Write,
{
    pub fn new(
        cfg: ExperimentConfig,
        clock: C,
        sink: S,
        ledger: Arc<DeliveryLedger>,
        out: W,
        stop: StopSignal,
    ) -> Self {
        let tx = Transmitter::new(
            sink,
            Arc::clone(&ledger),
            cfg.packet_size,
            cfg.progress_window(),
        );
        Self {
            cfg,
            clock,
            tx,
            ledger,
            log: RecordLog::new(out),
            stop,
            listener: None,
        }
    }

    pub fn with_ack_listener(mut self, listener: AckListenerHandle) -> Self {
        self.listener = Some(listener);
        self
    }

    /// 运行到实验时长用完或收到停止信号，返回汇总与记录流的底层 writer。
    pub fn run(self) -> Result<(SenderSummary, W), RunError> {
        let SenderSession {
            cfg,
            clock,
            mut tx,
            ledger,
            mut log,
            stop,
            listener,
        } = self;

        let start = clock.now();
        let end = start.saturating_add(cfg.duration());
        tx.window_mut().reset(start);
        log.write(&SenderRecord::Header(RunParams::from(&cfg)))?;
        info!(target_addr = %cfg.target, mode = %cfg.mode, duration_s = cfg.duration_s, "▶️  开始发送");

        let mut progress = |now: Timestamp, tx: &mut Transmitter<S>| -> Result<(), RunError> {
            if tx.window_mut().roll(now).is_some() {
                log.write(&SenderRecord::Progress {
                    t_ms: now.saturating_since(start).as_millis() as u64,
                    total_bytes_sent: tx.stats().bytes_sent,
                    total_acked_bytes: ledger.acked_bytes(),
                })?;
            }
            Ok(())
        };

        let mut ramp = None;
        if let Some(spec) = cfg.ramp {
            let remaining = end.saturating_since(clock.now());
            let phase = RatePhase::new(
                spec.rate_bps,
                cfg.packet_size,
                remaining.min(std::time::Duration::from_millis(spec.duration_ms)),
            );
            ramp = Some(phase.run(&mut tx, &clock, &stop, &mut progress)?);
        }

        let mut bursts = None;
        let mut volumetric = None;
        match cfg.mode {
            Mode::Burst => {
                let mut sched = BurstScheduler::new(BurstParams::from(&cfg), clock.now());
                debug!(
                    pacing = ?sched.pacing_interval(),
                    max_pkts_per_burst = sched.params().max_packets_per_burst(),
                    "突发模式开始"
                );
                loop {
                    let now = clock.now();
                    if stop.is_cancelled() || now >= end {
                        break;
                    }
                    sched.tick(now, &mut tx);
                    progress(now, &mut tx)?;
                    std::hint::spin_loop();
                }
                bursts = Some(sched.stats());
            }
            Mode::Volumetric => match cfg.rate_bps {
                Some(rate) => {
                    let remaining = end.saturating_since(clock.now());
                    let phase = RatePhase::new(rate, cfg.packet_size, remaining);
                    volumetric = Some(phase.run(&mut tx, &clock, &stop, &mut progress)?);
                }
                None => warn!("volumetric 模式缺少 rate_bps，跳过"),
            },
        }

        // 先停止并 join 监听线程，之后账本不再变化
        stop.cancel();
        let acks = match listener {
            Some(handle) => Some(handle.stop_and_join()?),
            None => None,
        };

        let finished = clock.now();
        let elapsed = finished.saturating_since(start);
        let snapshot = ledger.snapshot();
        let transmit = tx.stats();
        let average_bps = throughput_bps(transmit.bytes_sent, elapsed);

        log.write(&SenderRecord::Progress {
            t_ms: elapsed.as_millis() as u64,
            total_bytes_sent: transmit.bytes_sent,
            total_acked_bytes: snapshot.acked_bytes,
        })?;
        log.write(&SenderRecord::Average { bps: average_bps })?;
        log.flush()?;

        info!(
            packets = transmit.packets_sent,
            bytes = transmit.bytes_sent,
            acked_bytes = snapshot.acked_bytes,
            outstanding = snapshot.outstanding,
            average_bps,
            "✅ 发送完成"
        );

        let summary = SenderSummary {
            mode: cfg.mode,
            elapsed_ms: elapsed.as_secs_f64() * 1_000.0,
            average_bps,
            transmit,
            bursts,
            ramp,
            volumetric,
            acks,
            acked_bytes: snapshot.acked_bytes,
            acked_pkts: snapshot.acked_pkts,
            outstanding: snapshot.outstanding,
            outstanding_bytes: snapshot.outstanding_bytes,
        };
        Ok((summary, log.into_inner()))
    }
}

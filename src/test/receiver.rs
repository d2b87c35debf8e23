use std::collections::VecDeque;
use std::io;
use std::net::SocketAddr;
use std::sync::mpsc;
use std::time::Duration;

use super::{ChannelSource, RecordingSink};
use crate::config::ReceiverConfig;
use crate::error::{RunError, TransportError};
use crate::receiver::{MAX_RECV_FAILURES, ReceiverInstrumentation, run_receiver};
use crate::report::ReceiverRecord;
use crate::signal::StopSignal;
use crate::time::{ManualClock, Timestamp};
use crate::transport::DatagramSource;
use crate::wire::{DataPacket, PACKET_SIZE, decode_ack};

fn packet(seq: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    DataPacket::new(seq, PACKET_SIZE, Timestamp::ZERO).encode_into(&mut buf);
    buf
}

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

#[test]
fn three_packets_in_one_window_report_4500_bytes_at_3_6_mbps() {
    let mut inst = ReceiverInstrumentation::new(Timestamp::ZERO, Duration::from_millis(10));

    let (_, r1) = inst.on_datagram(Timestamp::from_millis(1), &packet(0));
    let (_, r2) = inst.on_datagram(Timestamp::from_millis(5), &packet(1));
    assert!(r1.is_none() && r2.is_none());
    assert_eq!(inst.window_bytes(), 3_000);

    let (arrival, records) = inst.on_datagram(Timestamp::from_millis(10), &packet(2));
    let [pkt, thr] = records.expect("window is due");
    assert_eq!(arrival.seq, Some(2));

    match pkt {
        ReceiverRecord::Packet {
            t_ms,
            seq,
            size_bytes,
            inter_arrival_ms,
        } => {
            assert!(approx(t_ms, 10.0));
            assert_eq!(seq, Some(2));
            assert_eq!(size_bytes, PACKET_SIZE);
            assert!(approx(inter_arrival_ms, 5.0));
        }
        other => panic!("unexpected record {other:?}"),
    }
    match thr {
        ReceiverRecord::Throughput { bytes, bps, .. } => {
            assert_eq!(bytes, 4_500);
            assert!((bps - 3_600_000.0).abs() < 1e-3, "bps={bps}");
        }
        other => panic!("unexpected record {other:?}"),
    }
    // 窗口已重置
    assert_eq!(inst.window_bytes(), 0);
    assert_eq!(inst.total_bytes(), 4_500);
}

#[test]
fn inter_arrival_is_exact_difference_of_receive_times() {
    let start = Timestamp::from_micros(500);
    let mut inst = ReceiverInstrumentation::new(start, Duration::from_millis(10));
    let times = [
        Timestamp::from_micros(700),
        Timestamp::from_micros(701),
        Timestamp(701_333),
        Timestamp::from_millis(30),
        Timestamp::from_millis(30),
    ];

    let mut prev = start;
    for (i, &at) in times.iter().enumerate() {
        let (arrival, _) = inst.on_datagram(at, &packet(i as u64));
        assert_eq!(arrival.inter_arrival, at.saturating_since(prev));
        assert_eq!(arrival.at, at);
        prev = at;
    }
    assert_eq!(inst.last_receive(), Timestamp::from_millis(30));
    assert_eq!(inst.packets(), times.len() as u64);
}

#[test]
fn short_datagram_is_counted_without_sequence_number() {
    let mut inst = ReceiverInstrumentation::new(Timestamp::ZERO, Duration::from_millis(1));
    let (arrival, records) = inst.on_datagram(Timestamp::from_millis(2), &[7, 7]);
    assert_eq!(arrival.seq, None);
    assert_eq!(arrival.size_bytes, 2);
    let [pkt, _] = records.expect("window is due");
    assert!(pkt.to_string().contains("Seq Number: N/A"));
}

#[test]
fn lifetime_average_covers_whole_run() {
    let mut inst = ReceiverInstrumentation::new(Timestamp::ZERO, Duration::from_millis(10));
    inst.on_datagram(Timestamp::from_millis(100), &packet(0));
    inst.on_datagram(Timestamp::from_millis(200), &packet(1));
    inst.on_datagram(Timestamp::from_millis(300), &packet(2));

    let (record, summary) = inst.finish(Timestamp::from_secs(1));
    assert_eq!(summary.total_bytes, 4_500);
    assert_eq!(summary.packets, 3);
    assert!(approx(summary.average_bps, 36_000.0));
    assert_eq!(record.to_string(), "Average Throughput (bps): 36000.00");
}

#[test]
fn run_receiver_logs_windows_and_echoes_acks() {
    let (data_tx, data_rx) = mpsc::channel();
    // 空数据报只用于唤醒，不计入
    data_tx.send(Vec::new()).expect("send");
    for seq in 0..3 {
        data_tx.send(packet(seq)).expect("send");
    }

    let mut cfg = ReceiverConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    cfg.max_packets = Some(3);
    let clock = ManualClock::with_step(Duration::from_millis(4));
    let mut source = ChannelSource { rx: data_rx };
    let mut echo = RecordingSink::default();

    let (summary, out) = run_receiver(
        &cfg,
        &clock,
        &mut source,
        Some(&mut echo),
        Vec::new(),
        &StopSignal::new(),
    )
    .expect("run");

    assert_eq!(summary.packets, 3);
    assert_eq!(summary.total_bytes, 3 * PACKET_SIZE as u64);

    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    // 开始 0ms，到达 4/8/12ms：第三个包触发窗口记录
    assert_eq!(lines.len(), 3, "log was:\n{text}");
    assert!(lines[0].starts_with("[Packet] Time(ms): 12.000, Seq Number: 2, Packet Size(bytes): 1500"));
    assert!(lines[1].starts_with("[Throughput] Time(ms): 12.000, Bytes Received: 4500, Throughput(bps): 3000000.00"));
    assert!(lines[2].starts_with("Average Throughput (bps): "));

    let acks: Vec<u64> = echo.datagrams().iter().filter_map(|m| decode_ack(m)).collect();
    assert_eq!(acks, vec![0, 1, 2]);
}

#[test]
fn run_receiver_stops_on_wakeup_after_stop_signal() {
    let (data_tx, data_rx) = mpsc::channel();
    data_tx.send(Vec::new()).expect("send");
    let stop = StopSignal::new();
    stop.cancel();

    let cfg = ReceiverConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    let (summary, out) = run_receiver::<_, _, RecordingSink, _>(
        &cfg,
        &ManualClock::new(),
        &mut ChannelSource { rx: data_rx },
        None,
        Vec::new(),
        &stop,
    )
    .expect("run");

    assert_eq!(summary.packets, 0);
    assert_eq!(String::from_utf8(out).expect("utf8"), "Average Throughput (bps): 0.00\n");
}

/// 按脚本返回：`None` 为一次接收失败，脚本耗尽后一直失败。
struct ScriptedSource {
    script: VecDeque<Option<Vec<u8>>>,
}

impl ScriptedSource {
    fn new(script: impl IntoIterator<Item = Option<Vec<u8>>>) -> Self {
        Self { script: script.into_iter().collect() }
    }
}

impl DatagramSource for ScriptedSource {
    fn recv(
        &mut self,
        buf: &mut [u8],
        _timeout: Option<Duration>,
    ) -> Result<Option<usize>, TransportError> {
        match self.script.pop_front().flatten() {
            Some(msg) => {
                buf[..msg.len()].copy_from_slice(&msg);
                Ok(Some(msg.len()))
            }
            None => Err(TransportError::Recv(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "icmp unreachable",
            ))),
        }
    }
}

#[test]
fn persistent_recv_errors_back_off_then_fail() {
    let clock = ManualClock::new();
    let cfg = ReceiverConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));

    let err = run_receiver::<_, _, RecordingSink, _>(
        &cfg,
        &clock,
        &mut ScriptedSource::new([]),
        None,
        Vec::new(),
        &StopSignal::new(),
    )
    .expect_err("must give up");

    match err {
        RunError::RecvFailing { failures, .. } => assert_eq!(failures, MAX_RECV_FAILURES),
        other => panic!("unexpected error: {other}"),
    }
    // 31 次退避：1,2,4,...,512ms，其余封顶 1s
    assert_eq!(clock.peek(), Timestamp::from_millis(1_023 + 21 * 1_000));
}

#[test]
fn recv_failure_count_resets_after_a_datagram_arrives() {
    let burst = MAX_RECV_FAILURES as usize - 1;
    let script = std::iter::repeat_n(None, burst)
        .chain([Some(packet(0))])
        .chain(std::iter::repeat_n(None, burst))
        .chain([Some(packet(1))]);

    let mut cfg = ReceiverConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    cfg.max_packets = Some(2);
    let (summary, _) = run_receiver::<_, _, RecordingSink, _>(
        &cfg,
        &ManualClock::new(),
        &mut ScriptedSource::new(script),
        None,
        Vec::new(),
        &StopSignal::new(),
    )
    .expect("run");

    assert_eq!(summary.packets, 2);
}

#[test]
fn stop_signal_ends_run_while_recv_is_failing() {
    let stop = StopSignal::new();
    stop.cancel();
    let cfg = ReceiverConfig::new(SocketAddr::from(([127, 0, 0, 1], 0)));
    let clock = ManualClock::new();

    let (summary, _) = run_receiver::<_, _, RecordingSink, _>(
        &cfg,
        &clock,
        &mut ScriptedSource::new([]),
        None,
        Vec::new(),
        &stop,
    )
    .expect("run");

    assert_eq!(summary.packets, 0);
    assert_eq!(clock.peek(), Timestamp::from_millis(1));
}

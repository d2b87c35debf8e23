use std::net::UdpSocket;
use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use super::ChannelSource;
use crate::ledger::DeliveryLedger;
use crate::sender::AckListener;
use crate::signal::StopSignal;
use crate::time::Timestamp;
use crate::transport::UdpSource;
use crate::wire::{PACKET_SIZE, encode_ack};

const PKT: u64 = PACKET_SIZE as u64;

fn wait_until(deadline: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

#[test]
fn listener_credits_even_acks_and_ignores_duplicates_and_malformed() {
    let ledger = Arc::new(DeliveryLedger::new());
    for seq in 0..10 {
        ledger.insert(seq, PKT, Timestamp::ZERO);
    }
    let (ack_tx, ack_rx) = mpsc::channel();
    let handle = AckListener::new(
        ChannelSource { rx: ack_rx },
        Arc::clone(&ledger),
        StopSignal::new(),
        Duration::from_millis(10),
    )
    .spawn()
    .expect("spawn");

    let msgs: Vec<Vec<u8>> = vec![
        encode_ack(0).to_vec(),
        encode_ack(2).to_vec(),
        vec![1, 2, 3],
        encode_ack(2).to_vec(),
        encode_ack(4).to_vec(),
        encode_ack(6).to_vec(),
        encode_ack(8).to_vec(),
    ];
    for m in msgs {
        ack_tx.send(m).expect("send ack");
    }

    assert!(wait_until(Duration::from_secs(5), || ledger.acked_bytes() == 5 * PKT));
    let stats = handle.stop_and_join().expect("join");

    assert_eq!(stats.received, 6);
    assert_eq!(stats.credited, 5);
    assert_eq!(stats.unmatched, 1);
    assert_eq!(stats.malformed, 1);
    assert_eq!(ledger.acked_bytes(), 5 * PKT);
    assert_eq!(ledger.outstanding_seqs(), vec![1, 3, 5, 7, 9]);
}

#[test]
fn listener_observes_stop_within_receive_timeout() {
    let (_ack_tx, ack_rx) = mpsc::channel::<Vec<u8>>();
    let handle = AckListener::new(
        ChannelSource { rx: ack_rx },
        Arc::new(DeliveryLedger::new()),
        StopSignal::new(),
        Duration::from_millis(20),
    )
    .spawn()
    .expect("spawn");

    let started = Instant::now();
    let stats = handle.stop_and_join().expect("join");
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(stats.received, 0);
}

#[test]
fn listener_over_udp_loopback() {
    let ledger = Arc::new(DeliveryLedger::new());
    ledger.insert(41, PKT, Timestamp::ZERO);
    ledger.insert(42, PKT, Timestamp::ZERO);

    let source = UdpSource::bind("127.0.0.1:0".parse().expect("addr")).expect("bind");
    let listen = source.local_addr().expect("local addr");
    let handle = AckListener::new(source, Arc::clone(&ledger), StopSignal::new(), Duration::from_millis(20))
        .spawn()
        .expect("spawn");

    let peer = UdpSocket::bind("127.0.0.1:0").expect("bind peer");
    peer.send_to(&encode_ack(42), listen).expect("send ack");
    // 长度不对的消息被丢弃
    peer.send_to(&[0u8; 3], listen).expect("send junk");

    assert!(wait_until(Duration::from_secs(5), || ledger.acked_bytes() == PKT));
    let stats = handle.stop_and_join().expect("join");
    assert_eq!(stats.credited, 1);
    assert_eq!(ledger.outstanding_seqs(), vec![41]);
}

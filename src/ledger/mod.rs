//! 投递账本（Delivery Ledger）
//!
//! 记录已发送但尚未确认的数据包：序列号 -> (字节数, 发送时间)，
//! 以及累计确认字节数。条目与计数器由同一把锁保护，
//! 插入、移除计入与快照都是原子操作。
//!
//! 从未被确认的条目会一直保留到运行结束，它们代表丢包，不做任何处理。

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use tracing::trace;

use crate::time::Timestamp;

/// 账本条目
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerEntry {
    pub size_bytes: u64,
    pub sent_at: Timestamp,
}

/// 账本在某一时刻的一致视图。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerSnapshot {
    pub outstanding: usize,
    pub outstanding_bytes: u64,
    pub acked_bytes: u64,
    pub acked_pkts: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<u64, LedgerEntry>,
    outstanding_bytes: u64,
    acked_bytes: u64,
    acked_pkts: u64,
}

#[derive(Debug, Default)]
pub struct DeliveryLedger {
    inner: Mutex<Inner>,
}

impl DeliveryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // 锁内没有会 panic 的操作，毒化后数据仍一致
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 登记一个即将交给传输层的数据包。
    pub fn insert(&self, seq: u64, size_bytes: u64, sent_at: Timestamp) {
        let mut g = self.lock();
        let entry = LedgerEntry {
            size_bytes,
            sent_at,
        };
        if let Some(old) = g.entries.insert(seq, entry) {
            g.outstanding_bytes = g.outstanding_bytes.saturating_sub(old.size_bytes);
        }
        g.outstanding_bytes = g.outstanding_bytes.saturating_add(size_bytes);
    }

    /// 收到 ACK：若条目存在则移除并计入确认字节数，返回计入的字节数。
    ///
    /// 重复或未知的 ACK 返回 `None`，不是错误。每个序列号最多计入一次。
    pub fn remove_and_credit(&self, seq: u64) -> Option<u64> {
        let mut g = self.lock();
        let entry = g.entries.remove(&seq)?;
        g.outstanding_bytes = g.outstanding_bytes.saturating_sub(entry.size_bytes);
        g.acked_bytes = g.acked_bytes.saturating_add(entry.size_bytes);
        g.acked_pkts = g.acked_pkts.saturating_add(1);
        trace!(seq, bytes = entry.size_bytes, acked_bytes = g.acked_bytes, "ACK 计入");
        Some(entry.size_bytes)
    }

    /// 撤销一个发送失败的条目，不计入确认字节数。
    pub fn discard(&self, seq: u64) -> Option<LedgerEntry> {
        let mut g = self.lock();
        let entry = g.entries.remove(&seq)?;
        g.outstanding_bytes = g.outstanding_bytes.saturating_sub(entry.size_bytes);
        Some(entry)
    }

    pub fn get(&self, seq: u64) -> Option<LedgerEntry> {
        self.lock().entries.get(&seq).copied()
    }

    pub fn acked_bytes(&self) -> u64 {
        self.lock().acked_bytes
    }

    pub fn snapshot(&self) -> LedgerSnapshot {
        let g = self.lock();
        LedgerSnapshot {
            outstanding: g.entries.len(),
            outstanding_bytes: g.outstanding_bytes,
            acked_bytes: g.acked_bytes,
            acked_pkts: g.acked_pkts,
        }
    }

    /// 未确认的序列号（升序）。
    pub fn outstanding_seqs(&self) -> Vec<u64> {
        self.lock().entries.keys().copied().collect()
    }
}

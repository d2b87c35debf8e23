//! 实验记录流
//!
//! 发送端与接收端各有一条只追加的记录流（文件或 stdout）。
//! 这里只定义记录的内容与行格式；诊断信息走 `tracing`，不进入记录流。

mod receiver;
mod sender;

pub use receiver::ReceiverRecord;
pub use sender::{RunParams, SenderRecord};

use std::fmt::Display;
use std::io::{self, Write};

/// 逐行写入记录
#[derive(Debug)]
pub struct RecordLog<W: Write> {
    out: W,
    lines: u64,
}

impl<W: Write> RecordLog<W> {
    pub fn new(out: W) -> Self {
        Self { out, lines: 0 }
    }

    pub fn write(&mut self, record: &impl Display) -> io::Result<()> {
        writeln!(self.out, "{record}")?;
        self.lines += 1;
        Ok(())
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

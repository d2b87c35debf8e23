//! 错误类型
//!
//! 传输错误是瞬时的，启动错误是致命的，运行错误来自记录流或后台线程。

use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::config::ConfigError;

/// 运行期的发送/接收错误，均视为瞬时错误。
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("short send: {sent} of {expected} bytes")]
    ShortSend { sent: usize, expected: usize },
    #[error("receive failed: {0}")]
    Recv(#[source] io::Error),
}

/// 启动阶段错误：一律致命，运行在进入任何循环之前终止。
#[derive(Debug, thiserror::Error)]
pub enum SetupError {
    #[error("bind {addr} failed: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("connect {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("socket option failed: {0}")]
    Socket(#[source] io::Error),
    #[error("cannot create log file {path:?}: {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot spawn thread: {0}")]
    Thread(#[source] io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 运行期错误（传输错误之外）
#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("record log write failed: {0}")]
    Log(#[from] io::Error),
    #[error("ack listener thread panicked")]
    ListenerPanicked,
    #[error("{failures} consecutive receive failures, last: {source}")]
    RecvFailing {
        failures: u32,
        #[source]
        source: TransportError,
    },
}

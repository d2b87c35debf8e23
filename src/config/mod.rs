//! 实验配置
//!
//! 核心只消费这些值，来源可以是命令行参数，也可以是 JSON 文件。

use std::fmt;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::wire::{HEADER_SIZE, PACKET_SIZE};

pub const DEFAULT_BURST_SIZE: u64 = 1024;
pub const DEFAULT_BURST_DURATION_MS: u64 = 40;
pub const DEFAULT_INTER_BURST_MS: u64 = 100;
pub const DEFAULT_DURATION_S: u64 = 10;
/// 发送端进度记录窗口（微秒）
pub const DEFAULT_PROGRESS_WINDOW_US: u64 = 1_000;
/// 接收端吞吐窗口（毫秒）
pub const DEFAULT_RECEIVER_WINDOW_MS: u64 = 10;
pub const DEFAULT_ACK_TIMEOUT_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("cannot read {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// 运行模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// 突发/空闲交替
    #[default]
    Burst,
    /// 整个运行期间恒定速率
    Volumetric,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Burst => f.write_str("burst"),
            Mode::Volumetric => f.write_str("volumetric"),
        }
    }
}

/// 恒定速率预热阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampSpec {
    pub duration_ms: u64,
    pub rate_bps: u64,
}

fn any_v4() -> SocketAddr {
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 0))
}
fn default_burst_size() -> u64 {
    DEFAULT_BURST_SIZE
}
fn default_burst_duration_ms() -> u64 {
    DEFAULT_BURST_DURATION_MS
}
fn default_inter_burst_ms() -> u64 {
    DEFAULT_INTER_BURST_MS
}
fn default_duration_s() -> u64 {
    DEFAULT_DURATION_S
}
fn default_packet_size() -> usize {
    PACKET_SIZE
}
fn default_progress_window_us() -> u64 {
    DEFAULT_PROGRESS_WINDOW_US
}
fn default_ack_timeout_ms() -> u64 {
    DEFAULT_ACK_TIMEOUT_MS
}

/// 发送端配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub target: SocketAddr,
    /// 数据发送 socket 的本地地址
    #[serde(default = "any_v4")]
    pub bind: SocketAddr,
    /// ACK 监听地址
    #[serde(default = "any_v4")]
    pub ack_bind: SocketAddr,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default = "default_burst_size")]
    pub burst_size: u64,
    #[serde(default = "default_burst_duration_ms")]
    pub burst_duration_ms: u64,
    #[serde(default = "default_inter_burst_ms")]
    pub inter_burst_ms: u64,
    #[serde(default = "default_duration_s")]
    pub duration_s: u64,
    /// volumetric 模式的速率（bps）
    #[serde(default)]
    pub rate_bps: Option<u64>,
    #[serde(default)]
    pub ramp: Option<RampSpec>,
    #[serde(default = "default_packet_size")]
    pub packet_size: usize,
    #[serde(default = "default_progress_window_us")]
    pub progress_window_us: u64,
    #[serde(default = "default_ack_timeout_ms")]
    pub ack_timeout_ms: u64,
}

impl ExperimentConfig {
    pub fn new(target: SocketAddr) -> Self {
        Self {
            target,
            bind: any_v4(),
            ack_bind: any_v4(),
            mode: Mode::Burst,
            burst_size: DEFAULT_BURST_SIZE,
            burst_duration_ms: DEFAULT_BURST_DURATION_MS,
            inter_burst_ms: DEFAULT_INTER_BURST_MS,
            duration_s: DEFAULT_DURATION_S,
            rate_bps: None,
            ramp: None,
            packet_size: PACKET_SIZE,
            progress_window_us: DEFAULT_PROGRESS_WINDOW_US,
            ack_timeout_ms: DEFAULT_ACK_TIMEOUT_MS,
        }
    }

    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let cfg: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: &str| Err(ConfigError::Invalid(msg.to_string()));
        if self.packet_size < HEADER_SIZE {
            return Err(ConfigError::Invalid(format!(
                "packet_size must be at least {HEADER_SIZE} bytes"
            )));
        }
        if self.duration_s == 0 {
            return invalid("duration_s must be positive");
        }
        if self.progress_window_us == 0 {
            return invalid("progress_window_us must be positive");
        }
        match self.mode {
            Mode::Burst => {
                if self.burst_size == 0 {
                    return invalid("burst_size must be positive");
                }
                if self.burst_duration_ms == 0 {
                    return invalid("burst_duration_ms must be positive");
                }
            }
            Mode::Volumetric => match self.rate_bps {
                None => return invalid("volumetric mode requires rate_bps"),
                Some(0) => return invalid("rate_bps must be positive"),
                Some(_) => {}
            },
        }
        if let Some(ramp) = self.ramp {
            if ramp.rate_bps == 0 {
                return invalid("ramp rate_bps must be positive");
            }
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_s)
    }

    pub fn burst_duration(&self) -> Duration {
        Duration::from_millis(self.burst_duration_ms)
    }

    pub fn inter_burst(&self) -> Duration {
        Duration::from_millis(self.inter_burst_ms)
    }

    pub fn progress_window(&self) -> Duration {
        Duration::from_micros(self.progress_window_us)
    }

    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }
}

/// 接收端配置
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    pub listen: SocketAddr,
    pub window: Duration,
    /// 收到这么多个数据报后结束（`None` 表示一直运行）
    pub max_packets: Option<u64>,
    /// 可选：把每个数据包的序列号作为 ACK 回送到该地址
    pub echo_acks_to: Option<SocketAddr>,
}

impl ReceiverConfig {
    pub fn new(listen: SocketAddr) -> Self {
        Self {
            listen,
            window: Duration::from_millis(DEFAULT_RECEIVER_WINDOW_MS),
            max_packets: None,
            echo_acks_to: None,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window.is_zero() {
            return Err(ConfigError::Invalid("window must be positive".to_string()));
        }
        Ok(())
    }
}

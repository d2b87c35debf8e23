//! 发送端
//!
//! 按突发模式或恒定速率向目标发送 UDP 流量，后台线程接收 ACK。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};
use udp_burst::config::{ExperimentConfig, Mode, RampSpec};
use udp_burst::error::SetupError;
use udp_burst::ledger::DeliveryLedger;
use udp_burst::sender::{AckListener, SenderSession};
use udp_burst::signal::StopSignal;
use udp_burst::time::MonotonicClock;
use udp_burst::transport::{UdpSink, UdpSource};

#[derive(Debug, Parser)]
#[command(name = "sender", about = "UDP 突发/恒定速率流量发生器")]
struct Args {
    /// 目标地址（ip:port）
    #[arg(long)]
    target: Option<SocketAddr>,

    /// 从 JSON 文件读取完整配置（忽略其余实验参数）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 运行模式：burst 或 volumetric
    #[arg(long, value_enum, default_value_t = ModeArg::Burst)]
    mode: ModeArg,

    /// 每次突发的字节数
    #[arg(long, default_value_t = udp_burst::config::DEFAULT_BURST_SIZE)]
    burst_size: u64,

    /// 突发时长（毫秒）
    #[arg(long, default_value_t = udp_burst::config::DEFAULT_BURST_DURATION_MS)]
    burst_duration_ms: u64,

    /// 两次突发之间的间隔（毫秒）
    #[arg(long, default_value_t = udp_burst::config::DEFAULT_INTER_BURST_MS)]
    inter_burst_ms: u64,

    /// 实验总时长（秒）
    #[arg(long, default_value_t = udp_burst::config::DEFAULT_DURATION_S)]
    duration_s: u64,

    /// volumetric 模式速率（bps）
    #[arg(long)]
    rate_bps: Option<u64>,

    /// 预热阶段时长（毫秒），需与 --ramp-rate-bps 同时给出
    #[arg(long, requires = "ramp_rate_bps")]
    ramp_ms: Option<u64>,

    /// 预热阶段速率（bps）
    #[arg(long, requires = "ramp_ms")]
    ramp_rate_bps: Option<u64>,

    #[arg(long, default_value_t = udp_burst::wire::PACKET_SIZE)]
    packet_size: usize,

    /// ACK 监听地址
    #[arg(long, default_value = "0.0.0.0:0")]
    ack_bind: SocketAddr,

    /// 记录输出文件（默认 stdout）
    #[arg(long)]
    log: Option<PathBuf>,

    /// 运行汇总 JSON 输出文件
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Burst,
    Volumetric,
}

impl Args {
    fn experiment(&self) -> Result<ExperimentConfig, SetupError> {
        if let Some(path) = &self.config {
            return Ok(ExperimentConfig::from_json_file(path)?);
        }
        let Some(target) = self.target else {
            return Err(udp_burst::config::ConfigError::Invalid(
                "either --target or --config is required".to_string(),
            )
            .into());
        };
        let mut cfg = ExperimentConfig::new(target);
        cfg.mode = match self.mode {
            ModeArg::Burst => Mode::Burst,
            ModeArg::Volumetric => Mode::Volumetric,
        };
        cfg.burst_size = self.burst_size;
        cfg.burst_duration_ms = self.burst_duration_ms;
        cfg.inter_burst_ms = self.inter_burst_ms;
        cfg.duration_s = self.duration_s;
        cfg.rate_bps = self.rate_bps;
        cfg.ramp = self
            .ramp_ms
            .zip(self.ramp_rate_bps)
            .map(|(duration_ms, rate_bps)| RampSpec {
                duration_ms,
                rate_bps,
            });
        cfg.packet_size = self.packet_size;
        cfg.ack_bind = self.ack_bind;
        cfg.validate()?;
        Ok(cfg)
    }
}

fn open_log(path: Option<&PathBuf>) -> Result<Box<dyn Write>, SetupError> {
    match path {
        Some(path) => {
            let f = File::create(path).map_err(|source| SetupError::LogFile {
                path: path.clone(),
                source,
            })?;
            Ok(Box::new(BufWriter::new(f)))
        }
        None => Ok(Box::new(io::stdout().lock())),
    }
}

fn main() -> ExitCode {
    // 初始化 tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    let cfg = match args.experiment() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "配置无效");
            return ExitCode::FAILURE;
        }
    };

    let stop = StopSignal::new();
    let ledger = Arc::new(DeliveryLedger::new());

    // 启动阶段的错误都是致命的
    let setup = || -> Result<_, SetupError> {
        let sink = UdpSink::connect(cfg.bind, cfg.target)?;
        let source = UdpSource::bind(cfg.ack_bind)?;
        info!(ack_listen = ?source.local_addr().ok(), "ACK 监听地址");
        let listener =
            AckListener::new(source, Arc::clone(&ledger), stop.clone(), cfg.ack_timeout()).spawn()?;
        let out = open_log(args.log.as_ref())?;
        Ok((sink, listener, out))
    };
    let (sink, listener, out) = match setup() {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, "启动失败");
            return ExitCode::FAILURE;
        }
    };

    let on_ctrlc = stop.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        info!("收到 Ctrl+C，停止发送");
        on_ctrlc.cancel();
    }) {
        error!(error = %e, "无法注册 Ctrl+C 处理");
    }

    let session = SenderSession::new(cfg, MonotonicClock::new(), sink, ledger, out, stop)
        .with_ack_listener(listener);
    let summary = match session.run() {
        Ok((summary, _out)) => summary,
        Err(e) => {
            error!(error = %e, "运行失败");
            return ExitCode::FAILURE;
        }
    };

    if let Some(path) = &args.summary_json {
        let written = serde_json::to_string_pretty(&summary)
            .map_err(io::Error::from)
            .and_then(|json| std::fs::write(path, json));
        if let Err(e) = written {
            error!(path = ?path, error = %e, "无法写入汇总");
            return ExitCode::FAILURE;
        }
    }
    ExitCode::SUCCESS
}

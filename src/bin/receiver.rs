//! 接收端
//!
//! 被动接收 UDP 数据报，记录到达间隔与窗口吞吐。

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, warn};
use udp_burst::config::{DEFAULT_RECEIVER_WINDOW_MS, ReceiverConfig};
use udp_burst::error::SetupError;
use udp_burst::receiver::run_receiver;
use udp_burst::signal::StopSignal;
use udp_burst::time::MonotonicClock;
use udp_burst::transport::{UdpSink, UdpSource, send_wake};

#[derive(Debug, Parser)]
#[command(name = "receiver", about = "UDP 接收端：到达间隔与吞吐统计")]
struct Args {
    /// 监听端口
    #[arg(long)]
    port: u16,

    /// 监听地址
    #[arg(long, default_value_t = Ipv4Addr::UNSPECIFIED)]
    bind_ip: Ipv4Addr,

    /// 吞吐窗口（毫秒）
    #[arg(long, default_value_t = DEFAULT_RECEIVER_WINDOW_MS)]
    window_ms: u64,

    /// 收到这么多个数据报后退出
    #[arg(long)]
    max_packets: Option<u64>,

    /// 把每个数据包的序列号作为 ACK 回送到该地址（默认关闭）
    #[arg(long)]
    echo_acks_to: Option<SocketAddr>,

    /// 记录输出文件（默认 stdout）
    #[arg(long)]
    log: Option<PathBuf>,
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
    let mut cfg = ReceiverConfig::new(SocketAddr::from((args.bind_ip, args.port)));
    cfg.window = Duration::from_millis(args.window_ms);
    cfg.max_packets = args.max_packets;
    cfg.echo_acks_to = args.echo_acks_to;

    let setup = || -> Result<_, SetupError> {
        cfg.validate()?;
        let source = UdpSource::bind(cfg.listen)?;
        let echo = match cfg.echo_acks_to {
            Some(to) => {
                let any = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
                Some(UdpSink::connect(any, to)?)
            }
            None => None,
        };
        let out: Box<dyn Write> = match &args.log {
            Some(path) => {
                let f = File::create(path).map_err(|source| SetupError::LogFile {
                    path: path.clone(),
                    source,
                })?;
                Box::new(BufWriter::new(f))
            }
            None => Box::new(io::stdout().lock()),
        };
        Ok((source, echo, out))
    };
    let (mut source, mut echo, out) = match setup() {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, "启动失败");
            return ExitCode::FAILURE;
        }
    };

    let stop = StopSignal::new();
    match source.wake_addr() {
        Ok(wake) => {
            // 接收没有超时：Ctrl+C 时给自己发一个空数据报唤醒阻塞的 recv
            let on_ctrlc = stop.clone();
            if let Err(e) = ctrlc::set_handler(move || {
                info!("收到 Ctrl+C，停止接收");
                on_ctrlc.cancel();
                if let Err(e) = send_wake(wake) {
                    warn!(%wake, error = %e, "无法唤醒接收端");
                }
            }) {
                warn!(error = %e, "无法注册 Ctrl+C 处理");
            }
            info!(listen = %cfg.listen, "接收端正在监听");
        }
        Err(e) => warn!(error = %e, "无法获取本地地址"),
    }

    match run_receiver(
        &cfg,
        &MonotonicClock::new(),
        &mut source,
        echo.as_mut(),
        out,
        &stop,
    ) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "运行失败");
            ExitCode::FAILURE
        }
    }
}

//! 滑动窗口 ARQ 仿真
//!
//! 单个发送端/接收端，按配置的丢包率与超时运行到所有包被确认（或到达时间上限）。

use arqsim_rs::proto::{ArqConfig, ArqWorld, Command, Control, ProtocolEngine};
use arqsim_rs::sim::{SimTime, Simulator};
use arqsim_rs::viz::VizLogger;
use clap::Parser;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "arq-sim", about = "滑动窗口 ARQ 仿真：超时重传 + 丢包/丢 ACK 注入")]
struct Args {
    /// JSON 配置文件；命令行参数会覆盖其中的同名字段
    #[arg(long)]
    config: Option<PathBuf>,

    /// 窗口大小
    #[arg(long)]
    window_size: Option<u64>,

    /// 数据包总数
    #[arg(long)]
    total_packets: Option<u64>,

    /// 数据包丢失率（百分比）
    #[arg(long)]
    packet_loss: Option<f64>,

    /// ACK 丢失率（百分比）
    #[arg(long)]
    ack_loss: Option<f64>,

    /// 重传超时（毫秒，1x 速度下）
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// 仿真倍速
    #[arg(long)]
    speed: Option<f64>,

    /// 丢包随机数种子
    #[arg(long)]
    seed: Option<u64>,

    /// 在该仿真时刻（毫秒）暂停
    #[arg(long)]
    pause_at_ms: Option<u64>,

    /// 在该仿真时刻（毫秒）恢复
    #[arg(long)]
    resume_at_ms: Option<u64>,

    /// 仿真运行到多少毫秒；不填则运行到事件队列为空
    #[arg(long)]
    until_ms: Option<u64>,

    /// 最多执行的事件数（丢包率 100% 时协议不会自行结束）
    #[arg(long, default_value_t = 1_000_000)]
    max_events: u64,

    /// 输出事件流 JSON 文件；不填则不生成
    #[arg(long)]
    events_json: Option<PathBuf>,

    /// 输出最终快照 JSON 文件
    #[arg(long)]
    snapshot_json: Option<PathBuf>,
}

impl Args {
    fn build_config(&self) -> Result<ArqConfig, Box<dyn Error>> {
        let mut cfg = match &self.config {
            Some(path) => ArqConfig::from_json_file(path)?,
            None => ArqConfig::default(),
        };
        if let Some(v) = self.window_size {
            cfg.window_size = v;
        }
        if let Some(v) = self.total_packets {
            cfg.total_packets = v;
        }
        if let Some(v) = self.packet_loss {
            cfg.packet_loss_rate = v;
        }
        if let Some(v) = self.ack_loss {
            cfg.ack_loss_rate = v;
        }
        if let Some(v) = self.timeout_ms {
            cfg.timeout_ms = v;
        }
        if let Some(v) = self.speed {
            cfg.speed_multiplier = v;
        }
        if self.seed.is_some() {
            cfg.seed = self.seed;
        }
        Ok(cfg)
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let cfg = args.build_config()?;
    let mut engine = ProtocolEngine::new(cfg)?;
    if args.events_json.is_some() {
        engine.viz = Some(VizLogger::default());
    }

    let mut sim = Simulator::default();
    let mut world = ArqWorld::new(engine);

    sim.schedule(SimTime::ZERO, Control(Command::Start));
    if let Some(ms) = args.pause_at_ms {
        sim.schedule(SimTime::from_millis(ms), Control(Command::Pause));
    }
    if let Some(ms) = args.resume_at_ms {
        sim.schedule(SimTime::from_millis(ms), Control(Command::Resume));
    }

    match args.until_ms {
        Some(ms) => sim.run_until(SimTime::from_millis(ms), &mut world),
        None => {
            sim.run_bounded(args.max_events, &mut world);
        }
    }

    let engine = &mut world.engine;
    if let Some(path) = &args.events_json {
        if let Some(v) = engine.viz.take() {
            fs::write(path, serde_json::to_string_pretty(&v.events)?)?;
            eprintln!("wrote {} events to {}", v.events.len(), path.display());
        }
    }

    let snap = engine.snapshot(sim.now());
    if let Some(path) = &args.snapshot_json {
        fs::write(path, serde_json::to_string_pretty(&snap)?)?;
    }

    let state = serde_json::to_value(snap.state)?;
    let s = &snap.stats;
    println!(
        "done @ {:.3}ms state={} run={}\n  sender: base={} next_seq_num={} window={:?}\n  receiver: expected_seq_num={} window={:?}\n  stats: packets_sent={} packets_received={} packets_lost={} packets_delivered={} acks_sent={} acks_lost={} acks_delivered={} timeouts={} retransmissions={}\n  duration_ms={:?}",
        sim.now().as_millis_f64(),
        state.as_str().unwrap_or("unknown"),
        snap.run.0,
        snap.base,
        snap.next_seq_num,
        snap.sender_window,
        snap.expected_seq_num,
        snap.receiver_window,
        s.packets_sent,
        s.packets_received,
        s.packets_lost,
        s.packets_delivered,
        s.acks_sent,
        s.acks_lost,
        s.acks_delivered,
        s.timeouts,
        s.retransmissions,
        s.duration().map(SimTime::as_millis_f64),
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::from(2)
        }
    }
}

//! 协议事件
//!
//! 引擎的每一个延迟都对应这里的一个事件类型。事件只携带 `(RunId, seq, ...)`
//! 这样的纯数据，执行时取出 `ArqWorld` 中的引擎并调用对应的入口；
//! 引擎是唯一的状态修改者。

use tracing::warn;

use super::engine::RunId;
use super::timer::TimerToken;
use super::world::with_engine;
use crate::sim::{Event, Simulator, World};

/// 尝试发出窗口内的下一个新包（发送间隔/窗口滑动后触发）
#[derive(Debug)]
pub struct TrySendNext {
    pub run: RunId,
}

impl Event for TrySendNext {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let TrySendNext { run } = *self;
        with_engine(world, |engine| engine.on_try_send_next(sim, run));
    }
}

/// 数据包的传输结果落地：到达接收端或被判定丢失
#[derive(Debug)]
pub struct PacketTransit {
    pub run: RunId,
    pub seq: u64,
    pub delivered: bool,
}

impl Event for PacketTransit {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let PacketTransit { run, seq, delivered } = *self;
        with_engine(world, |engine| engine.on_packet_transit(sim, run, seq, delivered));
    }
}

/// ACK 的传输结果落地
#[derive(Debug)]
pub struct AckTransit {
    pub run: RunId,
    pub seq: u64,
    pub delivered: bool,
}

impl Event for AckTransit {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let AckTransit { run, seq, delivered } = *self;
        with_engine(world, |engine| engine.on_ack_transit(sim, run, seq, delivered));
    }
}

/// 重传定时器到期；令牌过期时什么都不做
#[derive(Debug)]
pub struct RetransmitTimeout {
    pub run: RunId,
    pub token: TimerToken,
}

impl Event for RetransmitTimeout {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let RetransmitTimeout { run, token } = *self;
        with_engine(world, |engine| engine.on_retransmit_timeout(sim, run, token));
    }
}

/// 超时之后的实际重传
#[derive(Debug)]
pub struct Resend {
    pub run: RunId,
    pub seq: u64,
}

impl Event for Resend {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Resend { run, seq } = *self;
        with_engine(world, |engine| engine.on_resend(sim, run, seq));
    }
}

/// 重启：reset 之后延迟开始的那一步
#[derive(Debug)]
pub struct DeferredStart {
    pub run: RunId,
}

impl Event for DeferredStart {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let DeferredStart { run } = *self;
        with_engine(world, |engine| engine.on_deferred_start(sim, run));
    }
}

/// 外部命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Start,
    Pause,
    Resume,
    Reset,
    SetSpeed(f64),
}

/// 在指定仿真时刻执行一个外部命令，便于驱动方编排“t 时暂停、t' 时恢复”。
#[derive(Debug)]
pub struct Control(pub Command);

impl Event for Control {
    fn execute(self: Box<Self>, sim: &mut Simulator, world: &mut dyn World) {
        let Control(cmd) = *self;
        with_engine(world, |engine| match cmd {
            Command::Start => engine.start(sim),
            Command::Pause => {
                engine.pause(sim);
            }
            Command::Resume => {
                engine.resume(sim);
            }
            Command::Reset => engine.reset(sim),
            Command::SetSpeed(speed) => {
                if let Err(e) = engine.set_speed(speed) {
                    warn!(error = %e, "忽略非法倍速");
                }
            }
        });
    }
}

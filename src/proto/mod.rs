//! 滑动窗口 ARQ 协议模块
//!
//! 发送窗口、接收窗口、重传定时器、丢包注入，以及把它们串起来的协议引擎。

mod config;
mod engine;
mod error;
mod events;
mod loss;
mod receiver;
mod sender;
mod stats;
mod timer;
mod world;

pub use config::{ArqConfig, TimingConfig};
pub use engine::{ProtocolEngine, RunId, RunSnapshot, RunState};
pub use error::{ConfigError, EngineError, RateKind};
pub use events::{
    AckTransit, Command, Control, DeferredStart, PacketTransit, Resend, RetransmitTimeout,
    TrySendNext,
};
pub use loss::{LossModel, RandomLossOracle, ScriptedLoss};
pub use receiver::{Arrival, ReceiverStatus, ReceiverWindow};
pub use sender::{AckOutcome, SenderStatus, SenderWindow};
pub use stats::RunStats;
pub use timer::{TimerRegistry, TimerToken};
pub use world::ArqWorld;

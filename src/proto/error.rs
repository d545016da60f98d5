//! 配置与引擎命令的错误类型

use std::fmt;

use super::engine::RunState;

/// 丢失率作用的方向
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateKind {
    Packet,
    Ack,
}

impl fmt::Display for RateKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateKind::Packet => f.write_str("packet"),
            RateKind::Ack => f.write_str("ack"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("window size must be at least 1, got {0}")]
    WindowSize(u64),

    #[error("total packets ({total_packets}) must be at least the window size ({window_size})")]
    TotalPackets { total_packets: u64, window_size: u64 },

    #[error("{kind} loss rate must be within [0, 100], got {value}")]
    LossRate { kind: RateKind, value: f64 },

    #[error("timeout must be positive")]
    Timeout,

    #[error("speed multiplier must be a positive number, got {0}")]
    Speed(f64),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("configuration can only change while idle (current state: {state:?})")]
    NotIdle { state: RunState },
}

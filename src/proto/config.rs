//! 仿真配置
//!
//! 一次运行内不可变；只能在 Idle 状态下通过 `ProtocolEngine::configure` 替换。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::{ConfigError, RateKind};
use crate::sim::SimTime;

/// 协议时序常量（毫秒，1x 速度下的值），全部按 `1 / speed_multiplier` 缩放。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// 数据包/ACK 从一端到达另一端的时间
    pub transit_ms: u64,
    /// 丢失的数据包/ACK 被判定为丢失的时间（先于 `transit_ms`）
    pub loss_notice_ms: u64,
    /// 超时之后到真正重传之间的间隔
    pub retransmit_delay_ms: u64,
    /// 发送窗口滑动后再次尝试发送之前的等待
    pub slide_settle_ms: u64,
    /// 连续发送两个新包之间的间隔
    pub send_stagger_ms: u64,
    /// 运行中再次 start（重启）时，reset 与重新开始之间的间隔
    pub restart_delay_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            transit_ms: 1700,
            loss_notice_ms: 1000,
            retransmit_delay_ms: 500,
            slide_settle_ms: 500,
            send_stagger_ms: 300,
            restart_delay_ms: 100,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ArqConfig {
    /// 窗口大小（发送端与接收端相同）
    pub window_size: u64,
    /// 本次运行要发送的数据包总数
    pub total_packets: u64,
    /// 数据包丢失率（百分比，0..=100）
    pub packet_loss_rate: f64,
    /// ACK 丢失率（百分比，0..=100）
    pub ack_loss_rate: f64,
    /// 重传超时（毫秒，1x 速度下）
    pub timeout_ms: u64,
    /// 仿真倍速
    pub speed_multiplier: f64,
    /// 丢包随机数种子；不填则每次运行随机
    pub seed: Option<u64>,
    pub timing: TimingConfig,
}

impl Default for ArqConfig {
    fn default() -> Self {
        Self {
            window_size: 4,
            total_packets: 20,
            packet_loss_rate: 20.0,
            ack_loss_rate: 10.0,
            timeout_ms: 3000,
            speed_multiplier: 1.0,
            seed: None,
            timing: TimingConfig::default(),
        }
    }
}

impl ArqConfig {
    /// 从 JSON 文件加载；缺失字段取默认值。加载后立即校验。
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path.as_ref())?;
        let cfg: ArqConfig = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_size < 1 {
            return Err(ConfigError::WindowSize(self.window_size));
        }
        if self.total_packets < self.window_size {
            return Err(ConfigError::TotalPackets {
                total_packets: self.total_packets,
                window_size: self.window_size,
            });
        }
        check_rate(RateKind::Packet, self.packet_loss_rate)?;
        check_rate(RateKind::Ack, self.ack_loss_rate)?;
        if self.timeout_ms == 0 {
            return Err(ConfigError::Timeout);
        }
        validate_speed(self.speed_multiplier)
    }

    /// 把 1x 速度下的毫秒数换算成当前倍速下的仿真时长。
    pub fn scaled(&self, ms: u64) -> SimTime {
        SimTime::from_millis_scaled(ms, self.speed_multiplier)
    }
}

pub(crate) fn validate_speed(speed: f64) -> Result<(), ConfigError> {
    if speed.is_finite() && speed > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Speed(speed))
    }
}

fn check_rate(kind: RateKind, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::LossRate { kind, value })
    }
}

//! 丢包注入
//!
//! 引擎每发送一次数据包/ACK 就询问一次 [`LossModel`]。默认实现是
//! [`RandomLossOracle`]；测试里注入 [`ScriptedLoss`] 来精确指定丢哪些。

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use super::config::ArqConfig;

/// 决定单次传输是否丢失。
pub trait LossModel {
    fn should_lose_packet(&mut self) -> bool;
    fn should_lose_ack(&mut self) -> bool;

    /// 引擎重新配置时调用；脚本模型忽略它。
    fn reconfigure(&mut self, _cfg: &ArqConfig) {}
}

/// 两个方向独立的伯努利丢包（百分比）。
#[derive(Debug, Clone)]
pub struct RandomLossOracle {
    packet_loss_rate: f64,
    ack_loss_rate: f64,
    rng: ChaCha8Rng,
}

impl RandomLossOracle {
    pub fn new(packet_loss_rate: f64, ack_loss_rate: f64, seed: Option<u64>) -> Self {
        let seed = seed.unwrap_or_else(rand::random);
        Self {
            packet_loss_rate,
            ack_loss_rate,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    pub fn from_config(cfg: &ArqConfig) -> Self {
        Self::new(cfg.packet_loss_rate, cfg.ack_loss_rate, cfg.seed)
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    fn roll(&mut self, rate_percent: f64) -> bool {
        self.rng.random::<f64>() * 100.0 < rate_percent
    }
}

impl LossModel for RandomLossOracle {
    fn should_lose_packet(&mut self) -> bool {
        self.roll(self.packet_loss_rate)
    }

    fn should_lose_ack(&mut self) -> bool {
        self.roll(self.ack_loss_rate)
    }

    fn reconfigure(&mut self, cfg: &ArqConfig) {
        self.packet_loss_rate = cfg.packet_loss_rate;
        self.ack_loss_rate = cfg.ack_loss_rate;
        if let Some(seed) = cfg.seed {
            self.reseed(seed);
        }
    }
}

/// 回放固定结果：第 n 次数据包（或 ACK）传输丢失当且仅当第 n 项为 `true`；
/// 脚本用完之后不再丢失。
#[derive(Debug, Clone, Default)]
pub struct ScriptedLoss {
    packets: Vec<bool>,
    acks: Vec<bool>,
    packet_idx: usize,
    ack_idx: usize,
}

impl ScriptedLoss {
    pub fn new(packets: Vec<bool>, acks: Vec<bool>) -> Self {
        Self {
            packets,
            acks,
            packet_idx: 0,
            ack_idx: 0,
        }
    }

    /// 只丢列出的那几次传输（从 0 开始计数）。
    pub fn losing(packet_indices: &[usize], ack_indices: &[usize]) -> Self {
        Self::new(mask(packet_indices), mask(ack_indices))
    }
}

fn mask(indices: &[usize]) -> Vec<bool> {
    let len = indices.iter().max().map_or(0, |m| m + 1);
    let mut v = vec![false; len];
    for &i in indices {
        v[i] = true;
    }
    v
}

fn next(script: &[bool], idx: &mut usize) -> bool {
    let out = script.get(*idx).copied().unwrap_or(false);
    *idx += 1;
    out
}

impl LossModel for ScriptedLoss {
    fn should_lose_packet(&mut self) -> bool {
        next(&self.packets, &mut self.packet_idx)
    }

    fn should_lose_ack(&mut self) -> bool {
        next(&self.acks, &mut self.ack_idx)
    }
}

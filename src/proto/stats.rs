//! 统计信息
//!
//! 每次运行开始时归零的单调计数器。

use serde::{Deserialize, Serialize};

use crate::sim::SimTime;

/// 运行统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub packets_sent: u64,
    /// 被接收端新接收的包（重复/窗口外的不计）
    pub packets_received: u64,
    pub packets_lost: u64,
    /// 到达接收端的所有包（含重复）
    pub packets_delivered: u64,
    pub acks_sent: u64,
    pub acks_lost: u64,
    pub acks_delivered: u64,
    pub timeouts: u64,
    pub retransmissions: u64,
    pub started_at: Option<SimTime>,
    pub completed_at: Option<SimTime>,
}

impl RunStats {
    /// 运行耗时（仿真时间），未完成时为 `None`。
    pub fn duration(&self) -> Option<SimTime> {
        match (self.started_at, self.completed_at) {
            (Some(s), Some(e)) => Some(e.saturating_sub(s)),
            _ => None,
        }
    }
}

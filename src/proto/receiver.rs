//! 接收端滑动窗口
//!
//! 接收窗口为 `[expected_seq_num, expected_seq_num + window_size)`。
//! 无论是否接收，调用方都要对到达的序号回 ACK（逐包确认，而不是“下一个期望序号”）。

use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiverStatus {
    Awaiting,
    Received,
}

/// 一次到达的处理结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arrival {
    /// 新接收（窗口内且此前未收到）
    pub accepted: bool,
    /// `expected_seq_num` 前进的距离
    pub slide: u64,
}

#[derive(Debug, Clone)]
pub struct ReceiverWindow {
    window_size: u64,
    expected_seq_num: u64,
    status: Vec<ReceiverStatus>,
}

impl ReceiverWindow {
    pub fn new(window_size: u64, total_packets: u64) -> Self {
        Self {
            window_size,
            expected_seq_num: 0,
            status: vec![ReceiverStatus::Awaiting; total_packets as usize],
        }
    }

    pub fn expected_seq_num(&self) -> u64 {
        self.expected_seq_num
    }

    pub fn total_packets(&self) -> u64 {
        self.status.len() as u64
    }

    pub fn status(&self, seq: u64) -> Option<ReceiverStatus> {
        self.status.get(seq as usize).copied()
    }

    pub fn statuses(&self) -> &[ReceiverStatus] {
        &self.status
    }

    pub fn window(&self) -> Range<u64> {
        let end = self
            .expected_seq_num
            .saturating_add(self.window_size)
            .min(self.total_packets());
        self.expected_seq_num..end
    }

    pub fn on_packet_arrival(&mut self, seq: u64) -> Arrival {
        let rejected = Arrival {
            accepted: false,
            slide: 0,
        };
        if !self.window().contains(&seq) {
            return rejected;
        }
        if self.status[seq as usize] == ReceiverStatus::Received {
            return rejected;
        }

        self.status[seq as usize] = ReceiverStatus::Received;
        if seq != self.expected_seq_num {
            return Arrival {
                accepted: true,
                slide: 0,
            };
        }

        let old = self.expected_seq_num;
        let mut i = old + 1;
        while i < self.total_packets() && self.status[i as usize] == ReceiverStatus::Received {
            i += 1;
        }
        self.expected_seq_num = i;
        Arrival {
            accepted: true,
            slide: i - old,
        }
    }
}

//! 发送端滑动窗口
//!
//! ```text
//!   base        next_seq_num
//!    │               │
//! ───┼───────────────┼──────────┼────▶ seq
//!    │<── 已发送 ───▶│<─ 可发 ─▶│
//!    │<──────── window_size ───▶│
//! ```
//!
//! 只维护状态，不调度任何事件；调度由 `ProtocolEngine` 负责。

use std::collections::BTreeSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SenderStatus {
    Unsent,
    Sent,
    Acked,
    TimedOut,
}

/// `mark_acked` 的结果。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    /// 序号不在 `[base, base + window_size)` 内
    OutsideWindow,
    /// 已经确认过
    Duplicate,
    /// 新确认；`slide` 为 base 前进的距离（未滑动则为 0）
    Acked { slide: u64 },
}

impl AckOutcome {
    pub fn slide_distance(self) -> u64 {
        match self {
            AckOutcome::Acked { slide } => slide,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SenderWindow {
    window_size: u64,
    base: u64,
    next_seq_num: u64,
    status: Vec<SenderStatus>,
    in_flight: BTreeSet<u64>,
}

impl SenderWindow {
    pub fn new(window_size: u64, total_packets: u64) -> Self {
        Self {
            window_size,
            base: 0,
            next_seq_num: 0,
            status: vec![SenderStatus::Unsent; total_packets as usize],
            in_flight: BTreeSet::new(),
        }
    }

    pub fn base(&self) -> u64 {
        self.base
    }

    pub fn next_seq_num(&self) -> u64 {
        self.next_seq_num
    }

    pub fn window_size(&self) -> u64 {
        self.window_size
    }

    pub fn total_packets(&self) -> u64 {
        self.status.len() as u64
    }

    pub fn status(&self, seq: u64) -> Option<SenderStatus> {
        self.status.get(seq as usize).copied()
    }

    pub fn statuses(&self) -> &[SenderStatus] {
        &self.status
    }

    pub fn in_flight(&self) -> impl Iterator<Item = u64> + '_ {
        self.in_flight.iter().copied()
    }

    /// 当前窗口右边界（不含），不超过总包数。
    pub fn window_end(&self) -> u64 {
        self.base
            .saturating_add(self.window_size)
            .min(self.total_packets())
    }

    /// 可见窗口 `[base, min(base + window_size, total))`。
    pub fn window(&self) -> Range<u64> {
        self.base..self.window_end()
    }

    fn in_window(&self, seq: u64) -> bool {
        seq >= self.base && seq < self.base.saturating_add(self.window_size)
    }

    pub fn can_send(&self, seq: u64) -> bool {
        self.in_window(seq) && self.status(seq) == Some(SenderStatus::Unsent)
    }

    /// 取出下一个可首发的序号，并把 `next_seq_num` 推进一格。
    ///
    /// 到达窗口边界或总包数时返回 `None`，`next_seq_num` 保持不动。
    /// 非 Unsent 的位置会被直接跳过。
    pub fn next_to_send(&mut self) -> Option<u64> {
        while self.next_seq_num < self.window_end() {
            let seq = self.next_seq_num;
            self.next_seq_num += 1;
            if self.status(seq) == Some(SenderStatus::Unsent) {
                return Some(seq);
            }
        }
        None
    }

    /// Unsent -> Sent。不可发送时返回 `false`，状态不变。
    pub fn mark_sent(&mut self, seq: u64) -> bool {
        if !self.can_send(seq) {
            return false;
        }
        self.status[seq as usize] = SenderStatus::Sent;
        self.in_flight.insert(seq);
        true
    }

    /// Sent/TimedOut -> Acked；若恰好是 base，则越过连续的已确认前缀滑动窗口。
    pub fn mark_acked(&mut self, seq: u64) -> AckOutcome {
        if !self.in_window(seq) || seq >= self.total_packets() {
            return AckOutcome::OutsideWindow;
        }
        if self.status[seq as usize] == SenderStatus::Acked {
            return AckOutcome::Duplicate;
        }

        self.status[seq as usize] = SenderStatus::Acked;
        self.in_flight.remove(&seq);

        if seq != self.base {
            return AckOutcome::Acked { slide: 0 };
        }
        let old = self.base;
        let mut i = self.base + 1;
        while i < self.total_packets() && self.status[i as usize] == SenderStatus::Acked {
            i += 1;
        }
        self.base = i;
        // 已确认的包不可能位于 next_seq_num 之后，这里只是保持 base <= next_seq_num
        self.next_seq_num = self.next_seq_num.max(self.base);
        AckOutcome::Acked { slide: i - old }
    }

    /// Sent -> TimedOut；已确认的包保持不变（迟到的超时/丢包通知）。
    /// 返回状态是否发生了变化。
    pub fn mark_timed_out(&mut self, seq: u64) -> bool {
        match self.status(seq) {
            Some(SenderStatus::Sent) => {
                self.status[seq as usize] = SenderStatus::TimedOut;
                self.in_flight.remove(&seq);
                true
            }
            _ => false,
        }
    }

    /// 重传前的准备：TimedOut -> Unsent。其他状态（尤其是 Acked）不变。
    pub fn prepare_retransmit(&mut self, seq: u64) -> bool {
        if self.status(seq) != Some(SenderStatus::TimedOut) {
            return false;
        }
        self.status[seq as usize] = SenderStatus::Unsent;
        true
    }

    pub fn all_acked(&self) -> bool {
        self.status.iter().all(|s| *s == SenderStatus::Acked)
    }
}

use serde::{Deserialize, Serialize};

use crate::proto::RunId;

/// 窗口所属的一端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowSide {
    Sender,
    Receiver,
}

/// 被忽略的输入（诊断用，不是错误）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IgnoreReason {
    /// ACK 不在发送窗口内
    AckOutsideWindow,
    /// ACK 对应的包已经确认过
    DuplicateAck,
    /// 超时到期时包已被确认（迟到的定时器）
    LateTimeout,
}

/// 可视化事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VizEventKind {
    /// 新配置已生效（Idle 状态下）
    Configured { window_size: u64, total_packets: u64 },
    RunStarted,
    RunPaused,
    RunResumed,
    RunReset,
    /// 所有包均已确认
    RunCompleted,
    /// 发送端发出数据包；`retrans` 表示超时重传
    PacketSent { seq: u64, retrans: bool },
    /// 数据包在途中丢失
    PacketLost { seq: u64 },
    /// 数据包到达接收端；`accepted=false` 表示重复或窗口外
    PacketReceived { seq: u64, accepted: bool },
    AckSent { seq: u64 },
    AckLost { seq: u64 },
    AckReceived { seq: u64 },
    WindowSlide { side: WindowSide, from: u64, to: u64 },
    /// 重传定时器到期
    Timeout { seq: u64 },
    Ignored { seq: u64, reason: IgnoreReason },
}

/// 一条可回放的事件（JSON）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VizEvent {
    /// 仿真时间（纳秒，和 `SimTime.0` 同口径）
    pub t_ns: u64,
    pub run: RunId,
    #[serde(flatten)]
    pub kind: VizEventKind,
}

/// 事件订阅者（UI、日志、测试桩）。
pub trait Observer {
    fn on_event(&mut self, ev: &VizEvent);
}

/// 一个简单的事件收集器（存内存，仿真结束写 JSON 文件）
#[derive(Debug, Default)]
pub struct VizLogger {
    pub events: Vec<VizEvent>,
}

impl VizLogger {
    pub fn push(&mut self, ev: VizEvent) {
        self.events.push(ev);
    }

    pub fn kinds(&self) -> impl Iterator<Item = &VizEventKind> {
        self.events.iter().map(|e| &e.kind)
    }

    pub fn count(&self, pred: impl Fn(&VizEventKind) -> bool) -> usize {
        self.kinds().filter(|k| pred(k)).count()
    }
}

impl Observer for VizLogger {
    fn on_event(&mut self, ev: &VizEvent) {
        self.push(ev.clone());
    }
}

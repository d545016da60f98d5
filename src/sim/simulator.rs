//! 仿真器
//!
//! 单线程、事件驱动的逻辑时钟：维护当前时间与事件队列。
//! 事件之间从不并发，只在时间上交错，因此上层状态无需加锁。

use super::event::Event;
use super::scheduled_event::ScheduledEvent;
use super::time::SimTime;
use super::world::World;
use std::collections::BinaryHeap;
use tracing::{debug, info, trace};

/// 事件驱动仿真器：维护当前时间与事件队列。
#[derive(Default)]
pub struct Simulator {
    now: SimTime,
    next_seq: u64,
    executed: u64,
    q: BinaryHeap<ScheduledEvent>,
}

impl Simulator {
    /// 获取当前仿真时间
    pub fn now(&self) -> SimTime {
        self.now
    }

    /// 队列中尚未执行的事件数
    pub fn pending(&self) -> usize {
        self.q.len()
    }

    /// 已执行的事件总数
    pub fn executed(&self) -> u64 {
        self.executed
    }

    /// 下一个事件的执行时间
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.q.peek().map(ScheduledEvent::at)
    }

    /// 调度事件在指定时间执行；早于当前时间的请求按当前时间处理。
    pub fn schedule<E: Event>(&mut self, at: SimTime, ev: E) {
        let at = at.max(self.now);
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);

        trace!(now = ?self.now, ?at, seq, event = ev.label(), "调度事件");
        self.q.push(ScheduledEvent {
            at,
            seq,
            ev: Box::new(ev),
        });
    }

    /// 调度事件在 `delay` 之后执行。
    pub fn schedule_in<E: Event>(&mut self, delay: SimTime, ev: E) {
        let at = self.now.saturating_add(delay);
        self.schedule(at, ev);
    }

    /// 执行队首的一个事件；队列为空时返回 `false`。
    pub fn step(&mut self, world: &mut dyn World) -> bool {
        let Some(item) = self.q.pop() else {
            return false;
        };
        self.now = item.at;
        self.executed = self.executed.saturating_add(1);
        trace!(
            now = ?self.now,
            seq = item.seq,
            event = item.label(),
            remaining_queue = self.q.len(),
            "执行事件"
        );
        item.ev.execute(self, world);
        world.on_tick(self);
        true
    }

    /// 运行直到事件队列为空或到达 `until`。
    #[tracing::instrument(skip(self, world))]
    pub fn run_until(&mut self, until: SimTime, world: &mut dyn World) {
        while self.next_event_time().is_some_and(|at| at <= until) {
            self.step(world);
        }
        self.now = self.now.max(until);
        debug!(now = ?self.now, queue_size = self.q.len(), "run_until 结束");
    }

    /// 最多执行 `max_events` 个事件；返回实际执行的个数。
    ///
    /// 丢包率为 100% 时协议永远不会结束，驱动方用它给运行设上限。
    pub fn run_bounded(&mut self, max_events: u64, world: &mut dyn World) -> u64 {
        let mut n = 0;
        while n < max_events && self.step(world) {
            n += 1;
        }
        n
    }

    /// 运行所有事件直到队列为空。
    #[tracing::instrument(skip(self, world))]
    pub fn run(&mut self, world: &mut dyn World) {
        info!("▶️  开始运行仿真");
        debug!(now = ?self.now, queue_size = self.q.len(), "初始状态");

        let before = self.executed;
        while self.step(world) {}

        info!(
            total_events = self.executed - before,
            final_time = ?self.now,
            "✅ 仿真完成"
        );
    }
}

//! 重传定时器表
//!
//! 每个序号最多一个活动定时器。定时器本身就是调度在仿真时钟上的一个事件，
//! 事件里携带 [`TimerToken`]（序号 + generation）；触发时先调用
//! [`TimerRegistry::fire`] 核对令牌，令牌过期（已被 cancel / 重新 arm /
//! 暂停）则什么都不做。这样 cancel 之后回调不会再执行，一次 arm 也只会触发一次。

use std::collections::BTreeMap;

use crate::sim::{Event, SimTime, Simulator};

/// 标识一次 `arm` 调用。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerToken {
    pub seq: u64,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct TimerSlot {
    generation: u64,
    deadline: SimTime,
}

#[derive(Debug)]
pub struct TimerRegistry {
    speed: f64,
    next_generation: u64,
    live: BTreeMap<u64, TimerSlot>,
    // 暂停期间：seq -> 剩余时长
    suspended: BTreeMap<u64, SimTime>,
}

impl TimerRegistry {
    pub fn new(speed: f64) -> Self {
        Self {
            speed,
            next_generation: 0,
            live: BTreeMap::new(),
            suspended: BTreeMap::new(),
        }
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    /// 为 `seq` 启动定时器：先取消已有的，再在 `delay_ms / speed` 之后调度
    /// `on_fire(token)` 生成的事件。
    pub fn arm<E, F>(&mut self, seq: u64, delay_ms: u64, sim: &mut Simulator, on_fire: F) -> TimerToken
    where
        E: Event,
        F: FnOnce(TimerToken) -> E,
    {
        self.cancel(seq);
        let delay = SimTime::from_millis_scaled(delay_ms, self.speed);
        self.schedule(seq, delay, sim, on_fire)
    }

    fn schedule<E, F>(&mut self, seq: u64, delay: SimTime, sim: &mut Simulator, on_fire: F) -> TimerToken
    where
        E: Event,
        F: FnOnce(TimerToken) -> E,
    {
        let generation = self.next_generation;
        self.next_generation = self.next_generation.wrapping_add(1);
        let deadline = sim.now().saturating_add(delay);
        self.live.insert(seq, TimerSlot { generation, deadline });

        let token = TimerToken { seq, generation };
        sim.schedule(deadline, on_fire(token));
        token
    }

    /// 取消 `seq` 的定时器；返回是否真的取消了一个。
    pub fn cancel(&mut self, seq: u64) -> bool {
        let live = self.live.remove(&seq).is_some();
        let suspended = self.suspended.remove(&seq).is_some();
        live || suspended
    }

    /// 取消全部定时器（reset 时使用）；返回取消的个数。
    pub fn cancel_all(&mut self) -> usize {
        let n = self.live.len() + self.suspended.len();
        self.live.clear();
        self.suspended.clear();
        n
    }

    /// 定时器事件到期时调用：令牌仍有效则消费该槽位并返回 `true`。
    pub fn fire(&mut self, token: TimerToken) -> bool {
        match self.live.get(&token.seq) {
            Some(slot) if slot.generation == token.generation => {
                self.live.remove(&token.seq);
                true
            }
            _ => false,
        }
    }

    /// 暂停：记录每个活动定时器的剩余时间，使其已调度的事件失效。
    pub fn suspend(&mut self, now: SimTime) {
        for (seq, slot) in std::mem::take(&mut self.live) {
            self.suspended.insert(seq, slot.deadline.saturating_sub(now));
        }
    }

    /// 恢复：按剩余时间重新调度所有被暂停的定时器。
    pub fn resume<E, F>(&mut self, sim: &mut Simulator, mut on_fire: F)
    where
        E: Event,
        F: FnMut(TimerToken) -> E,
    {
        for (seq, remaining) in std::mem::take(&mut self.suspended) {
            self.schedule(seq, remaining, sim, &mut on_fire);
        }
    }

    /// `seq` 是否有定时器（活动或暂停中）。
    pub fn is_armed(&self, seq: u64) -> bool {
        self.live.contains_key(&seq) || self.suspended.contains_key(&seq)
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn suspended_count(&self) -> usize {
        self.suspended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty() && self.suspended.is_empty()
    }

    /// 活动定时器的到期时间（按序号排序）。
    pub fn deadlines(&self) -> impl Iterator<Item = (u64, SimTime)> + '_ {
        self.live.iter().map(|(&seq, slot)| (seq, slot.deadline))
    }
}

//! 滑动窗口 ARQ 协议引擎
//!
//! 把发送窗口、接收窗口、定时器表和丢包模型串起来，并向外部发出事件流。
//!
//! 单个包（发送端）的生命周期：
//!
//! ```text
//! Unsent -> Sent -> Acked
//!             \-> TimedOut -> Unsent -> Sent -> ...（超时重传）
//! ```
//!
//! 运行状态：`Idle -> Running -> {Paused <-> Running} -> Completed`。
//!
//! 所有延迟都是调度到 [`Simulator`] 上的事件（见 `proto::events`），事件里带着
//! [`RunId`]；reset 之后旧运行的事件全部作废。除少数“结果一旦决定就必须落地”
//! 的路径（丢包/丢 ACK 的计数）之外，所有操作只在 Running 状态下生效，
//! 其他状态下静默丢弃。

use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::config::{ArqConfig, validate_speed};
use super::error::EngineError;
use super::events::{AckTransit, DeferredStart, PacketTransit, Resend, RetransmitTimeout, TrySendNext};
use super::loss::{LossModel, RandomLossOracle};
use super::receiver::{ReceiverStatus, ReceiverWindow};
use super::sender::{AckOutcome, SenderStatus, SenderWindow};
use super::stats::RunStats;
use super::timer::{TimerRegistry, TimerToken};
use crate::sim::{SimTime, Simulator};
use crate::viz::{IgnoreReason, Observer, VizEvent, VizEventKind, VizLogger, WindowSide};

/// 一次运行（两次 reset 之间）的标识。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct RunId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Paused,
    Completed,
}

/// 一次运行的全部可变状态；reset 时整体丢弃重建。
#[derive(Debug)]
struct SimulationRun {
    id: RunId,
    state: RunState,
    sender: SenderWindow,
    receiver: ReceiverWindow,
    timers: TimerRegistry,
    stats: RunStats,
}

impl SimulationRun {
    fn new(id: RunId, cfg: &ArqConfig) -> Self {
        Self {
            id,
            state: RunState::Idle,
            sender: SenderWindow::new(cfg.window_size, cfg.total_packets),
            receiver: ReceiverWindow::new(cfg.window_size, cfg.total_packets),
            timers: TimerRegistry::new(cfg.speed_multiplier),
            stats: RunStats::default(),
        }
    }
}

/// 供渲染层/CLI 使用的只读快照。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSnapshot {
    pub t_ns: u64,
    pub run: RunId,
    pub state: RunState,
    pub base: u64,
    pub next_seq_num: u64,
    pub expected_seq_num: u64,
    pub sender_window: Range<u64>,
    pub receiver_window: Range<u64>,
    pub sender: Vec<SenderStatus>,
    pub receiver: Vec<ReceiverStatus>,
    pub in_flight: Vec<u64>,
    pub armed_timers: usize,
    pub stats: RunStats,
}

pub struct ProtocolEngine {
    config: ArqConfig,
    loss: Box<dyn LossModel>,
    run: SimulationRun,
    next_run_id: u64,
    observers: Vec<Box<dyn Observer>>,
    /// 可选的内存事件记录（`--events-json` / 测试使用）
    pub viz: Option<VizLogger>,
}

impl ProtocolEngine {
    pub fn new(config: ArqConfig) -> Result<Self, EngineError> {
        let loss = RandomLossOracle::from_config(&config);
        Self::with_loss_model(config, Box::new(loss))
    }

    pub fn with_loss_model(config: ArqConfig, loss: Box<dyn LossModel>) -> Result<Self, EngineError> {
        config.validate()?;
        let run = SimulationRun::new(RunId(0), &config);
        Ok(Self {
            config,
            loss,
            run,
            next_run_id: 1,
            observers: Vec::new(),
            viz: None,
        })
    }

    pub fn set_loss_model(&mut self, loss: Box<dyn LossModel>) {
        self.loss = loss;
    }

    pub fn subscribe(&mut self, observer: Box<dyn Observer>) {
        self.observers.push(observer);
    }

    pub fn config(&self) -> &ArqConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // 外部命令
    // ------------------------------------------------------------------

    /// 替换配置；仅在 Idle 状态下有效，非法配置被拒绝且不影响当前配置。
    pub fn configure(&mut self, sim: &Simulator, config: ArqConfig) -> Result<(), EngineError> {
        if self.run.state != RunState::Idle {
            return Err(EngineError::NotIdle {
                state: self.run.state,
            });
        }
        config.validate()?;

        self.loss.reconfigure(&config);
        self.config = config;
        self.run = SimulationRun::new(self.fresh_run_id(), &self.config);

        info!(
            window_size = self.config.window_size,
            total_packets = self.config.total_packets,
            packet_loss_rate = self.config.packet_loss_rate,
            ack_loss_rate = self.config.ack_loss_rate,
            timeout_ms = self.config.timeout_ms,
            "⚙️  配置已更新"
        );
        self.emit(
            sim.now(),
            VizEventKind::Configured {
                window_size: self.config.window_size,
                total_packets: self.config.total_packets,
            },
        );
        Ok(())
    }

    /// 开始按钮语义：Idle 时开始；Paused 时恢复；Running/Completed 时重启。
    #[tracing::instrument(skip(self, sim))]
    pub fn start(&mut self, sim: &mut Simulator) {
        match self.run.state {
            RunState::Idle => {
                self.run.state = RunState::Running;
                self.run.stats.started_at = Some(sim.now());
                info!("▶️  运行开始");
                self.emit(sim.now(), VizEventKind::RunStarted);
                self.try_send_next(sim);
            }
            RunState::Paused => {
                self.resume(sim);
            }
            RunState::Running | RunState::Completed => {
                self.restart(sim);
            }
        }
    }

    /// reset 后，在重启延迟之后重新开始。
    pub fn restart(&mut self, sim: &mut Simulator) {
        self.reset(sim);
        let run = self.run.id;
        sim.schedule_in(
            self.config.scaled(self.config.timing.restart_delay_ms),
            DeferredStart { run },
        );
    }

    /// Running -> Paused：冻结所有定时器的剩余时间。
    pub fn pause(&mut self, sim: &mut Simulator) -> bool {
        if self.run.state != RunState::Running {
            trace!(state = ?self.run.state, "pause 被忽略");
            return false;
        }
        self.run.state = RunState::Paused;
        self.run.timers.suspend(sim.now());
        info!(suspended_timers = self.run.timers.suspended_count(), "⏸️  运行暂停");
        self.emit(sim.now(), VizEventKind::RunPaused);
        true
    }

    /// Paused -> Running：按剩余时间恢复定时器并继续发送。
    pub fn resume(&mut self, sim: &mut Simulator) -> bool {
        if self.run.state != RunState::Paused {
            trace!(state = ?self.run.state, "resume 被忽略");
            return false;
        }
        self.run.state = RunState::Running;
        let run = self.run.id;
        self.run
            .timers
            .resume(sim, |token| RetransmitTimeout { run, token });
        info!(live_timers = self.run.timers.live_count(), "▶️  运行恢复");
        self.emit(sim.now(), VizEventKind::RunResumed);

        // 暂停期间被丢弃的重传：包停在 TimedOut 且已没有定时器，需要重新安排
        let stranded: Vec<u64> = self
            .run
            .sender
            .window()
            .filter(|&seq| {
                self.run.sender.status(seq) == Some(SenderStatus::TimedOut)
                    && !self.run.timers.is_armed(seq)
            })
            .collect();
        for seq in stranded {
            debug!(seq, "恢复暂停期间搁置的重传");
            sim.schedule_in(
                self.config.scaled(self.config.timing.retransmit_delay_ms),
                Resend { run, seq },
            );
        }

        self.try_send_next(sim);
        true
    }

    /// 取消所有定时器，丢弃全部状态，回到 Idle。
    #[tracing::instrument(skip(self, sim))]
    pub fn reset(&mut self, sim: &mut Simulator) {
        let cancelled = self.run.timers.cancel_all();
        self.run = SimulationRun::new(self.fresh_run_id(), &self.config);
        info!(cancelled_timers = cancelled, new_run = self.run.id.0, "🔄 运行重置");
        self.emit(sim.now(), VizEventKind::RunReset);
    }

    /// 调整倍速；任何状态下都可以，只影响之后调度的延迟。
    pub fn set_speed(&mut self, speed: f64) -> Result<(), EngineError> {
        validate_speed(speed)?;
        self.config.speed_multiplier = speed;
        self.run.timers.set_speed(speed);
        debug!(speed, "倍速已更新");
        Ok(())
    }

    // ------------------------------------------------------------------
    // 查询
    // ------------------------------------------------------------------

    pub fn state(&self) -> RunState {
        self.run.state
    }

    pub fn run_id(&self) -> RunId {
        self.run.id
    }

    pub fn is_running(&self) -> bool {
        self.run.state == RunState::Running
    }

    pub fn is_completed(&self) -> bool {
        self.run.state == RunState::Completed
    }

    pub fn base(&self) -> u64 {
        self.run.sender.base()
    }

    pub fn next_seq_num(&self) -> u64 {
        self.run.sender.next_seq_num()
    }

    pub fn expected_seq_num(&self) -> u64 {
        self.run.receiver.expected_seq_num()
    }

    pub fn sender(&self) -> &SenderWindow {
        &self.run.sender
    }

    pub fn receiver(&self) -> &ReceiverWindow {
        &self.run.receiver
    }

    pub fn timers(&self) -> &TimerRegistry {
        &self.run.timers
    }

    pub fn stats(&self) -> &RunStats {
        &self.run.stats
    }

    pub fn snapshot(&self, now: SimTime) -> RunSnapshot {
        RunSnapshot {
            t_ns: now.0,
            run: self.run.id,
            state: self.run.state,
            base: self.base(),
            next_seq_num: self.next_seq_num(),
            expected_seq_num: self.expected_seq_num(),
            sender_window: self.run.sender.window(),
            receiver_window: self.run.receiver.window(),
            sender: self.run.sender.statuses().to_vec(),
            receiver: self.run.receiver.statuses().to_vec(),
            in_flight: self.run.sender.in_flight().collect(),
            armed_timers: self.run.timers.live_count() + self.run.timers.suspended_count(),
            stats: self.run.stats.clone(),
        }
    }

    // ------------------------------------------------------------------
    // 事件入口（由 `proto::events` 调用）
    // ------------------------------------------------------------------

    pub(crate) fn on_try_send_next(&mut self, sim: &mut Simulator, run: RunId) {
        if self.is_current(run) {
            self.try_send_next(sim);
        }
    }

    pub(crate) fn on_packet_transit(&mut self, sim: &mut Simulator, run: RunId, seq: u64, delivered: bool) {
        if !self.is_current(run) {
            return;
        }
        if delivered {
            self.run.stats.packets_delivered += 1;
            self.receive(sim, seq);
        } else {
            // 丢失只标记 TimedOut；真正的重传仍等已启动的定时器
            self.run.stats.packets_lost += 1;
            self.emit(sim.now(), VizEventKind::PacketLost { seq });
            self.run.sender.mark_timed_out(seq);
        }
    }

    pub(crate) fn on_ack_transit(&mut self, sim: &mut Simulator, run: RunId, seq: u64, delivered: bool) {
        if !self.is_current(run) {
            return;
        }
        if delivered {
            self.run.stats.acks_delivered += 1;
            self.on_ack_received(sim, seq);
        } else {
            // 发送端收不到任何东西，只能靠超时恢复
            self.run.stats.acks_lost += 1;
            self.emit(sim.now(), VizEventKind::AckLost { seq });
        }
    }

    pub(crate) fn on_retransmit_timeout(&mut self, sim: &mut Simulator, run: RunId, token: TimerToken) {
        if !self.is_current(run) || !self.run.timers.fire(token) {
            trace!(seq = token.seq, "过期定时器");
            return;
        }
        if !self.guard("retransmit_timeout") {
            return;
        }
        let seq = token.seq;
        if self.run.sender.status(seq) == Some(SenderStatus::Acked) {
            self.ignored(sim.now(), seq, IgnoreReason::LateTimeout);
            return;
        }

        self.run.stats.timeouts += 1;
        info!(seq, "⏰ 超时，准备重传");
        self.emit(sim.now(), VizEventKind::Timeout { seq });
        self.run.sender.mark_timed_out(seq);
        sim.schedule_in(
            self.config.scaled(self.config.timing.retransmit_delay_ms),
            Resend { run, seq },
        );
    }

    pub(crate) fn on_resend(&mut self, sim: &mut Simulator, run: RunId, seq: u64) {
        if !self.is_current(run) || !self.guard("resend") {
            return;
        }
        if !self.run.sender.prepare_retransmit(seq) {
            if self.run.sender.status(seq) == Some(SenderStatus::Acked) {
                self.ignored(sim.now(), seq, IgnoreReason::LateTimeout);
            }
            return;
        }
        self.send(sim, seq, true);
    }

    pub(crate) fn on_deferred_start(&mut self, sim: &mut Simulator, run: RunId) {
        if self.is_current(run) && self.run.state == RunState::Idle {
            self.start(sim);
        }
    }

    // ------------------------------------------------------------------
    // 协议转换
    // ------------------------------------------------------------------

    /// 发出窗口内下一个未发送的包，然后隔一个发送间隔再试一次；
    /// 到达窗口边界时停下，等 ACK/超时重新触发。
    fn try_send_next(&mut self, sim: &mut Simulator) {
        if !self.guard("try_send_next") {
            return;
        }
        match self.run.sender.next_to_send() {
            Some(seq) => {
                self.send(sim, seq, false);
                let run = self.run.id;
                sim.schedule_in(
                    self.config.scaled(self.config.timing.send_stagger_ms),
                    TrySendNext { run },
                );
            }
            None => self.check_completion(sim.now()),
        }
    }

    fn send(&mut self, sim: &mut Simulator, seq: u64, retrans: bool) {
        if !self.guard("send") {
            return;
        }
        if !self.run.sender.mark_sent(seq) {
            debug!(seq, status = ?self.run.sender.status(seq), "包不可发送");
            return;
        }

        self.run.stats.packets_sent += 1;
        if retrans {
            self.run.stats.retransmissions += 1;
        }
        self.emit(sim.now(), VizEventKind::PacketSent { seq, retrans });

        let lost = self.loss.should_lose_packet();
        let run = self.run.id;
        self.run
            .timers
            .arm(seq, self.config.timeout_ms, sim, |token| RetransmitTimeout { run, token });

        let delay = self.transit_delay(lost);
        sim.schedule_in(
            delay,
            PacketTransit {
                run,
                seq,
                delivered: !lost,
            },
        );
    }

    fn receive(&mut self, sim: &mut Simulator, seq: u64) {
        if !self.guard("receive") {
            return;
        }
        let arrival = self.run.receiver.on_packet_arrival(seq);
        if arrival.accepted {
            self.run.stats.packets_received += 1;
        }
        self.emit(
            sim.now(),
            VizEventKind::PacketReceived {
                seq,
                accepted: arrival.accepted,
            },
        );
        if arrival.slide > 0 {
            let to = self.run.receiver.expected_seq_num();
            self.emit(
                sim.now(),
                VizEventKind::WindowSlide {
                    side: WindowSide::Receiver,
                    from: to - arrival.slide,
                    to,
                },
            );
        }
        // 窗口内外、是否重复，都对到达的序号回 ACK
        self.ack(sim, seq);
    }

    fn ack(&mut self, sim: &mut Simulator, seq: u64) {
        if !self.guard("ack") {
            return;
        }
        self.run.stats.acks_sent += 1;
        self.emit(sim.now(), VizEventKind::AckSent { seq });

        let lost = self.loss.should_lose_ack();
        let run = self.run.id;
        let delay = self.transit_delay(lost);
        sim.schedule_in(
            delay,
            AckTransit {
                run,
                seq,
                delivered: !lost,
            },
        );
    }

    fn on_ack_received(&mut self, sim: &mut Simulator, seq: u64) {
        if !self.guard("ack_received") {
            return;
        }
        self.emit(sim.now(), VizEventKind::AckReceived { seq });

        let outcome = self.run.sender.mark_acked(seq);
        self.run.timers.cancel(seq);
        match outcome {
            AckOutcome::OutsideWindow => self.ignored(sim.now(), seq, IgnoreReason::AckOutsideWindow),
            AckOutcome::Duplicate => self.ignored(sim.now(), seq, IgnoreReason::DuplicateAck),
            AckOutcome::Acked { slide } if slide > 0 => {
                let to = self.run.sender.base();
                self.emit(
                    sim.now(),
                    VizEventKind::WindowSlide {
                        side: WindowSide::Sender,
                        from: to - slide,
                        to,
                    },
                );
                let run = self.run.id;
                sim.schedule_in(
                    self.config.scaled(self.config.timing.slide_settle_ms),
                    TrySendNext { run },
                );
            }
            AckOutcome::Acked { .. } => {}
        }
        self.check_completion(sim.now());
    }

    fn check_completion(&mut self, now: SimTime) {
        if self.run.state != RunState::Running || !self.run.sender.all_acked() {
            return;
        }
        self.run.state = RunState::Completed;
        self.run.stats.completed_at = Some(now);
        self.run.timers.cancel_all();
        info!(
            packets_sent = self.run.stats.packets_sent,
            timeouts = self.run.stats.timeouts,
            t_ms = now.as_millis_f64(),
            "✅ 所有数据包均已确认"
        );
        self.emit(now, VizEventKind::RunCompleted);
    }

    // ------------------------------------------------------------------
    // 内部工具
    // ------------------------------------------------------------------

    fn fresh_run_id(&mut self) -> RunId {
        let id = RunId(self.next_run_id);
        self.next_run_id += 1;
        id
    }

    fn is_current(&self, run: RunId) -> bool {
        if run != self.run.id {
            trace!(event_run = run.0, current_run = self.run.id.0, "旧运行的事件，丢弃");
            return false;
        }
        true
    }

    /// 唯一的并发保护：非 Running 状态下静默丢弃操作。
    fn guard(&self, op: &'static str) -> bool {
        if self.run.state != RunState::Running {
            trace!(op, state = ?self.run.state, "非运行状态，操作被丢弃");
            return false;
        }
        true
    }

    fn transit_delay(&self, lost: bool) -> SimTime {
        let timing = &self.config.timing;
        let ms = if lost {
            timing.loss_notice_ms
        } else {
            timing.transit_ms
        };
        self.config.scaled(ms)
    }

    fn ignored(&mut self, now: SimTime, seq: u64, reason: IgnoreReason) {
        debug!(seq, ?reason, "输入被忽略");
        self.emit(now, VizEventKind::Ignored { seq, reason });
    }

    fn emit(&mut self, now: SimTime, kind: VizEventKind) {
        debug!(t_ns = now.0, run = self.run.id.0, event = ?kind, "协议事件");
        let ev = VizEvent {
            t_ns: now.0,
            run: self.run.id,
            kind,
        };
        for observer in self.observers.iter_mut() {
            observer.on_event(&ev);
        }
        if let Some(v) = self.viz.as_mut() {
            v.push(ev);
        }
    }
}

//! 时间轮控制循环
//! Time wheel control loop
//!
//! 控制循环独占时间轮数据结构。它在单个 tokio 任务中依次处理 tick、
//! 添加、取消与查询命令，因此时间轮本身无需任何锁。
//!
//! The control loop exclusively owns the timing wheel. It serializes ticks,
//! additions, removals and queries on a single tokio task, so the wheel itself
//! needs no locking.

use crate::config::WheelConfig;
use crate::error::Result;
use crate::wheel::{Task, TaskId, TimingWheel};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, trace};

use super::commands::{WheelCommand, WheelStats};
use super::dispatch::Dispatcher;

/// 控制循环的发送端集合，由句柄持有
/// Sender side of the control loop, held by the handle
pub(crate) struct WheelChannels {
    pub(crate) add_tx: mpsc::UnboundedSender<Task>,
    pub(crate) remove_tx: mpsc::UnboundedSender<TaskId>,
    pub(crate) command_tx: mpsc::UnboundedSender<WheelCommand>,
    pub(crate) stop_tx: oneshot::Sender<()>,
}

/// 时间轮控制任务
/// Time wheel control task
pub(crate) struct WheelTask {
    /// 时间轮
    /// Timing wheel
    wheel: TimingWheel,
    /// 添加队列
    /// Add queue
    add_rx: mpsc::UnboundedReceiver<Task>,
    /// 取消队列
    /// Remove queue
    remove_rx: mpsc::UnboundedReceiver<TaskId>,
    /// 查询命令接收通道
    /// Query command receiver channel
    command_rx: mpsc::UnboundedReceiver<WheelCommand>,
    /// 停止信号，发送端被丢弃同样视为停止
    /// Stop signal; dropping the sender also counts as a stop
    stop_rx: oneshot::Receiver<()>,
    dispatcher: Dispatcher,
    /// 统计信息
    /// Statistics
    stats: WheelStats,
}

impl WheelTask {
    /// 创建控制任务及其对应的发送端
    /// Create the control task together with its sender side
    pub(crate) fn new(config: &WheelConfig) -> Result<(Self, WheelChannels)> {
        config.validate()?;
        let wheel = TimingWheel::new(config.tick, config.bucket_count)?;

        let (add_tx, add_rx) = mpsc::unbounded_channel();
        let (remove_tx, remove_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (stop_tx, stop_rx) = oneshot::channel();

        let stats = WheelStats::new(wheel.stats());
        let task = Self {
            wheel,
            add_rx,
            remove_rx,
            command_rx,
            stop_rx,
            dispatcher: Dispatcher::new(&config.dispatch),
            stats,
        };
        let channels = WheelChannels {
            add_tx,
            remove_tx,
            command_tx,
            stop_tx,
        };
        Ok((task, channels))
    }

    /// 运行控制循环，直到收到停止信号
    /// Run the control loop until a stop signal arrives
    pub(crate) async fn run(mut self) {
        let tick = self.wheel.tick();
        info!(
            tick_ms = tick.as_millis() as u64,
            bucket_count = self.wheel.bucket_count(),
            "Time wheel control loop started"
        );

        // 第一次 tick 发生在启动后一个完整间隔
        // The first tick happens one full interval after start
        let mut ticker = interval_at(Instant::now() + tick, tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                biased;

                _ = &mut self.stop_rx => {
                    info!("Received stop signal");
                    break;
                }

                _ = ticker.tick() => {
                    self.handle_tick();
                }

                Some(task) = self.add_rx.recv() => {
                    self.handle_add(task);
                }

                Some(id) = self.remove_rx.recv() => {
                    self.handle_remove(id);
                }

                Some(command) = self.command_rx.recv() => {
                    self.handle_command(command);
                }
            }
        }

        info!(
            ticks = self.stats.ticks,
            fired = self.stats.fired_callbacks,
            abandoned = self.wheel.len(),
            "Time wheel control loop shutdown completed"
        );
    }

    /// 推进一格并派发所有到期回调
    /// Advance one bucket and dispatch every matured callback
    fn handle_tick(&mut self) {
        self.stats.ticks += 1;
        let expired = self.wheel.advance();
        if expired.is_empty() {
            return;
        }

        let count = expired.len();
        for entry in expired {
            trace!(task_id = %entry.id, requeued = entry.requeued, "Dispatching expired task");
            self.dispatcher.dispatch(entry.id, entry.callback);
        }
        self.stats.fired_callbacks += count as u64;

        debug!(
            count,
            current_index = self.wheel.current_index(),
            pending = self.wheel.len(),
            "Dispatched expired callbacks"
        );
    }

    fn handle_add(&mut self, task: Task) {
        let id = task.id();
        if self.wheel.insert(task) {
            self.stats.submitted_tasks += 1;
            trace!(task_id = %id, "Task placed into wheel");
        } else {
            // 在放置之前就已被取消
            self.stats.cancelled_tasks += 1;
            trace!(task_id = %id, "Task cancelled before placement, dropped");
        }
    }

    fn handle_remove(&mut self, id: TaskId) {
        match self.wheel.remove(id) {
            Some(_) => {
                self.stats.cancelled_tasks += 1;
                trace!(task_id = %id, "Task removed from wheel");
            }
            None => {
                trace!(task_id = %id, "Remove ignored, task not in wheel");
            }
        }
    }

    fn handle_command(&mut self, command: WheelCommand) {
        match command {
            WheelCommand::GetStats { response_tx } => {
                let mut stats = self.stats.clone();
                stats.wheel = self.wheel.stats();
                let _ = response_tx.send(stats);
            }
        }
    }
}

//! 控制循环命令定义
//! Control loop command definitions
//!
//! 添加与取消各自拥有独立的通道；本模块定义其余需要应答的命令以及
//! 控制循环的统计信息。
//!
//! Adds and removes travel on dedicated channels; this module defines the
//! remaining request/response commands and the control loop statistics.

use crate::wheel::TimingWheelStats;
use tokio::sync::oneshot;

/// 控制循环命令
/// Control loop commands
#[derive(Debug)]
pub(crate) enum WheelCommand {
    /// 获取统计信息
    /// Get statistics
    GetStats {
        response_tx: oneshot::Sender<WheelStats>,
    },
}

/// 控制循环统计信息
/// Control loop statistics
#[derive(Debug, Clone)]
pub struct WheelStats {
    /// 已处理的 tick 数
    /// Number of processed ticks
    pub ticks: u64,
    /// 已放入时间轮的任务数
    /// Number of tasks placed into the wheel
    pub submitted_tasks: u64,
    /// 已派发的回调数（周期任务每次触发都计数）
    /// Number of dispatched callbacks, counting every firing of a repeating task
    pub fired_callbacks: u64,
    /// 已取消的任务数
    /// Number of cancelled tasks
    pub cancelled_tasks: u64,
    /// 时间轮统计信息
    /// Timing wheel statistics
    pub wheel: TimingWheelStats,
}

impl WheelStats {
    pub(crate) fn new(wheel: TimingWheelStats) -> Self {
        Self {
            ticks: 0,
            submitted_tasks: 0,
            fired_callbacks: 0,
            cancelled_tasks: 0,
            wheel,
        }
    }

    /// 待触发的任务数
    /// Number of pending tasks
    pub fn pending_tasks(&self) -> usize {
        self.wheel.pending_tasks
    }
}

impl std::fmt::Display for WheelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ticks, {} submitted, {} fired, {} cancelled; {}",
            self.ticks,
            self.submitted_tasks,
            self.fired_callbacks,
            self.cancelled_tasks,
            self.wheel
        )
    }
}

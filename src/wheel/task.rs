//! 时间轮任务定义
//! Time wheel task definitions

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// 任务的唯一标识符，在一个时间轮的生命周期内单调递增
/// Unique task identifier, monotonically increasing for the lifetime of a wheel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl TaskId {
    /// 从数值创建任务ID
    /// Create task ID from a raw value
    pub fn new(id: u64) -> Self {
        TaskId(id)
    }

    /// 获取任务ID的数值
    /// Get the raw value of the task ID
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 用户提供的零参数回调
/// User-supplied zero-argument callback
pub type Callback = Arc<dyn Fn() + Send + Sync + 'static>;

/// 时间轮中的任务
/// A task held by the time wheel
pub struct Task {
    /// 任务ID
    /// Task ID
    pub(crate) id: TaskId,
    /// 首次触发前的延迟，周期任务每次重新放置时复用
    /// Delay before the first firing, reused on every requeue of a repeating task
    pub(crate) delay: Duration,
    /// 在当前槽位到期前还需经过的完整轮数
    /// Full revolutions left before the task matures in its current bucket
    pub(crate) round: usize,
    pub(crate) callback: Callback,
    /// 是否为周期任务
    /// Whether the task is re-inserted after each firing
    pub(crate) repeating: bool,
    /// 与句柄共享的停止标记
    /// Stop flag shared with the handle
    pub(crate) stopped: Arc<AtomicBool>,
}

impl Task {
    /// 创建一次性任务
    /// Create a one-shot task
    pub fn once(id: TaskId, delay: Duration, callback: Callback) -> Self {
        Self::new(id, delay, callback, false)
    }

    /// 创建周期任务
    /// Create a repeating task
    pub fn repeat(id: TaskId, delay: Duration, callback: Callback) -> Self {
        Self::new(id, delay, callback, true)
    }

    fn new(id: TaskId, delay: Duration, callback: Callback, repeating: bool) -> Self {
        Self {
            id,
            delay,
            round: 0,
            callback,
            repeating,
            stopped: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn round(&self) -> usize {
        self.round
    }

    pub fn is_repeating(&self) -> bool {
        self.repeating
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 创建指向该任务的句柄
    /// Create a handle referring to this task
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            id: self.id,
            wheel: 0,
            stopped: Arc::clone(&self.stopped),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("delay", &self.delay)
            .field("round", &self.round)
            .field("repeating", &self.repeating)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// 任务句柄，用于取消已提交的任务
/// Task handle, used to cancel a submitted task
///
/// 句柄与任务共享停止标记：即使取消请求先于添加请求到达控制循环，
/// 控制循环在放置或触发任务时也会观察到该标记并丢弃任务。
///
/// The handle shares the stop flag with its task: even when the cancel
/// request reaches the control loop before the add request, the loop sees
/// the flag at placement or maturation and drops the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    /// 签发该句柄的时间轮标识，0 表示未绑定
    /// Identity of the issuing wheel, 0 when unbound
    wheel: u64,
    stopped: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// 绑定到签发它的时间轮
    /// Bind to the wheel that issued it
    pub(crate) fn issued_by(mut self, wheel: u64) -> Self {
        self.wheel = wheel;
        self
    }

    pub(crate) fn wheel(&self) -> u64 {
        self.wheel
    }

    /// 任务是否已被请求停止
    /// Whether a stop was requested for the task
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// 标记任务为已停止，返回之前是否已经停止
    /// Mark the task stopped, returning whether it already was
    pub(crate) fn mark_stopped(&self) -> bool {
        self.stopped.swap(true, Ordering::AcqRel)
    }
}

/// 到期任务，由时间轮推进时产生
/// Matured task produced by an advance of the wheel
#[derive(Clone)]
pub struct Expired {
    pub id: TaskId,
    pub callback: Callback,
    /// 该任务是否已被重新放入时间轮
    /// Whether the task was put back into the wheel
    pub requeued: bool,
}

impl fmt::Debug for Expired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Expired")
            .field("id", &self.id)
            .field("requeued", &self.requeued)
            .finish()
    }
}

//! 时间轮句柄
//! Time wheel handle
//!
//! [`TimeWheel`] 是与控制循环通信的客户端句柄。添加与取消通过无界通道
//! 提交，调用方永远不会被阻塞；只有统计查询需要等待控制循环的应答。
//!
//! [`TimeWheel`] is the client handle that talks to the control loop. Adds and
//! removes are submitted over unbounded channels and never block the caller;
//! only statistics queries wait for a reply from the loop.

use crate::config::WheelConfig;
use crate::error::{Error, Result};
use crate::wheel::{Callback, Task, TaskHandle, TaskId};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::commands::{WheelCommand, WheelStats};
use super::control::WheelTask;

/// 时间轮句柄，可廉价克隆并在任务间共享
/// Time wheel handle, cheap to clone and share between tasks
///
/// 所有克隆都被丢弃后，控制循环随之退出。
/// The control loop exits once every clone has been dropped.
#[derive(Clone)]
pub struct TimeWheel {
    inner: Arc<Inner>,
}

/// 时间轮标识分配器，用于识别其他时间轮签发的句柄
/// Wheel identity allocator, used to recognise handles issued by other wheels
static NEXT_WHEEL_ID: AtomicU64 = AtomicU64::new(1);

struct Inner {
    /// 时间轮标识
    /// Wheel identity
    wheel_id: u64,
    tick: Duration,
    bucket_count: usize,
    /// 下一个分配的任务ID
    /// Next task ID to allocate
    next_id: AtomicU64,
    started: AtomicBool,
    add_tx: mpsc::UnboundedSender<Task>,
    remove_tx: mpsc::UnboundedSender<TaskId>,
    command_tx: mpsc::UnboundedSender<WheelCommand>,
    stop_tx: Mutex<Option<oneshot::Sender<()>>>,
    /// 尚未启动的控制任务，启动前提交的任务在其中排队
    /// Control task that has not been started yet; submissions queue up in it
    pending: Mutex<Option<WheelTask>>,
    join_handle: Mutex<Option<JoinHandle<()>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl TimeWheel {
    /// 以给定的 tick 与槽位数创建时间轮，控制循环尚未运行
    /// Create a wheel with the given tick and bucket count; the loop is not running yet
    pub fn new(tick: Duration, bucket_count: usize) -> Result<Self> {
        Self::with_config(WheelConfig {
            tick,
            bucket_count,
            ..WheelConfig::default()
        })
    }

    /// 以完整配置创建时间轮
    /// Create a wheel from a full configuration
    pub fn with_config(config: WheelConfig) -> Result<Self> {
        let (task, channels) = WheelTask::new(&config)?;

        debug!(
            tick_ms = config.tick.as_millis() as u64,
            bucket_count = config.bucket_count,
            dispatch_mode = ?config.dispatch.mode,
            "Time wheel created"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                wheel_id: NEXT_WHEEL_ID.fetch_add(1, Ordering::Relaxed),
                tick: config.tick,
                bucket_count: config.bucket_count,
                next_id: AtomicU64::new(1),
                started: AtomicBool::new(false),
                add_tx: channels.add_tx,
                remove_tx: channels.remove_tx,
                command_tx: channels.command_tx,
                stop_tx: Mutex::new(Some(channels.stop_tx)),
                pending: Mutex::new(Some(task)),
                join_handle: Mutex::new(None),
            }),
        })
    }

    /// 在当前 tokio 运行时上启动控制循环
    /// Start the control loop on the current tokio runtime
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::RuntimeUnavailable)?;
        if lock(&self.inner.stop_tx).is_none() {
            return Err(Error::WheelStopped);
        }
        let Some(task) = lock(&self.inner.pending).take() else {
            warn!("Time wheel start ignored, control loop already running");
            return Err(Error::AlreadyStarted);
        };

        let join = runtime.spawn(task.run());
        *lock(&self.inner.join_handle) = Some(join);
        self.inner.started.store(true, Ordering::Release);

        info!(
            tick_ms = self.inner.tick.as_millis() as u64,
            bucket_count = self.inner.bucket_count,
            "Time wheel started"
        );
        Ok(())
    }

    /// 请求控制循环停止，不等待其退出
    /// Ask the control loop to stop without waiting for it to exit
    ///
    /// 尚未到期的任务被丢弃，不会触发。对已停止的时间轮再次调用返回
    /// [`Error::WheelStopped`]。
    ///
    /// Pending tasks are abandoned and never fire. Calling this on a wheel
    /// that was already stopped returns [`Error::WheelStopped`].
    pub fn stop(&self) -> Result<()> {
        let stop_tx = lock(&self.inner.stop_tx).take().ok_or(Error::WheelStopped)?;
        // 循环已经退出时发送失败，结果相同
        let _ = stop_tx.send(());

        // 从未启动的控制任务直接丢弃
        lock(&self.inner.pending).take();

        info!("Time wheel stop requested");
        Ok(())
    }

    /// 停止控制循环并等待其退出
    /// Stop the control loop and wait for it to exit
    pub async fn shutdown(&self) -> Result<()> {
        self.stop()?;
        let join = lock(&self.inner.join_handle).take();
        if let Some(join) = join {
            join.await.map_err(|_| Error::ChannelClosed)?;
        }
        Ok(())
    }

    /// 控制循环是否已经退出（或从未启动就被停止）
    /// Whether the control loop has exited, or was stopped before it ever started
    pub fn is_closed(&self) -> bool {
        self.inner.add_tx.is_closed()
    }

    /// 是否已调用过 `start`
    /// Whether `start` has been called
    pub fn is_started(&self) -> bool {
        self.inner.started.load(Ordering::Acquire)
    }

    /// tick 时长
    /// Tick duration
    pub fn tick(&self) -> Duration {
        self.inner.tick
    }

    /// 槽位数
    /// Bucket count
    pub fn bucket_count(&self) -> usize {
        self.inner.bucket_count
    }

    /// 安排一次性任务，在 `delay` 之后执行 `callback`
    /// Schedule `callback` to run once after `delay`
    pub fn add<F>(&self, delay: Duration, callback: F) -> Result<TaskHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.submit(delay, Arc::new(callback), false)
    }

    /// 安排周期任务，每隔 `delay` 执行一次 `callback`，直到被取消
    /// Schedule `callback` to run every `delay` until it is removed
    pub fn add_cron<F>(&self, delay: Duration, callback: F) -> Result<TaskHandle>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.submit(delay, Arc::new(callback), true)
    }

    fn submit(&self, delay: Duration, callback: Callback, repeating: bool) -> Result<TaskHandle> {
        if delay.is_zero() {
            return Err(Error::InvalidDelay(delay));
        }

        let id = TaskId::new(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let task = if repeating {
            Task::repeat(id, delay, callback)
        } else {
            Task::once(id, delay, callback)
        };
        let handle = task.handle().issued_by(self.inner.wheel_id);

        self.inner
            .add_tx
            .send(task)
            .map_err(|_| Error::WheelStopped)?;

        trace!(task_id = %id, delay_ms = delay.as_millis() as u64, repeating, "Task submitted");
        Ok(handle)
    }

    /// 取消任务，幂等
    /// Cancel a task; idempotent
    ///
    /// 标记立即生效：即使任务尚未被控制循环放置，或时间轮已停止，它也不会再触发。
    /// 已经派发的回调不会被中断。
    ///
    /// The mark takes effect immediately: the task never fires again even if
    /// the loop has not placed it yet or the wheel has stopped. A callback that
    /// was already dispatched is not interrupted.
    ///
    /// 其他时间轮签发的句柄被忽略，不会影响任何任务。
    /// A handle issued by another wheel is ignored and affects no task.
    pub fn remove(&self, handle: &TaskHandle) -> Result<()> {
        if handle.wheel() != self.inner.wheel_id {
            trace!(
                task_id = %handle.id(),
                issued_by = handle.wheel(),
                wheel = self.inner.wheel_id,
                "Remove ignored, handle belongs to another wheel"
            );
            return Ok(());
        }
        if handle.mark_stopped() {
            return Ok(());
        }
        if self.inner.remove_tx.send(handle.id()).is_err() {
            trace!(task_id = %handle.id(), "Remove after loop exit, nothing to release");
        }
        Ok(())
    }

    /// 查询控制循环的统计信息
    /// Query control loop statistics
    pub async fn stats(&self) -> Result<WheelStats> {
        let (response_tx, response_rx) = oneshot::channel();
        self.inner
            .command_tx
            .send(WheelCommand::GetStats { response_tx })
            .map_err(|_| Error::WheelStopped)?;
        response_rx.await.map_err(|_| Error::ChannelClosed)
    }
}

impl fmt::Debug for TimeWheel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeWheel")
            .field("tick", &self.inner.tick)
            .field("bucket_count", &self.inner.bucket_count)
            .field("closed", &self.is_closed())
            .finish()
    }
}

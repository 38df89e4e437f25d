//! 基于时间轮的定时器与周期触发器
//! Timers and tickers built on the time wheel
//!
//! 这些类型只使用时间轮的公开接口：每个定时器在时间轮中注册一个任务，
//! 任务的回调向一个容量为1的通道发送通知。消费者不及时读取时，
//! 多余的通知会被丢弃而不会阻塞控制循环。
//!
//! These types use nothing but the public wheel API: each one registers a task
//! whose callback pushes a notification into a channel of capacity one. When
//! the consumer falls behind, surplus notifications are dropped instead of
//! blocking the control loop.

use crate::error::{Error, Result};
use crate::task::TimeWheel;
use crate::wheel::{TaskHandle, TaskId};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};

/// 容量为1的通知回调，满时丢弃
/// Notification callback into a capacity-one slot, dropping when full
fn notify(tx: mpsc::Sender<()>) -> impl Fn() + Send + Sync + 'static {
    move || {
        let _ = tx.try_send(());
    }
}

/// 一次性定时器
/// One-shot timer
///
/// 到期后恰好产生一次通知。被丢弃时自动取消尚未到期的任务。
/// Produces exactly one notification when it matures. Dropping it cancels the
/// task if it has not matured yet.
#[derive(Debug)]
pub struct Timer {
    wheel: TimeWheel,
    handle: TaskHandle,
    rx: mpsc::Receiver<()>,
}

impl Timer {
    /// 等待到期通知
    /// Wait for the notification
    ///
    /// 已到期且通知已被取走，或定时器被停止后，返回 `None`。
    /// Returns `None` once the notification has been taken, or after the
    /// timer was stopped.
    pub async fn recv(&mut self) -> Option<()> {
        self.rx.recv().await
    }

    /// 非阻塞地检查是否已到期
    /// Check for the notification without waiting
    pub fn try_recv(&mut self) -> bool {
        self.rx.try_recv().is_ok()
    }

    /// 以新的延迟重新安排定时器
    /// Re-arm the timer with a new delay
    ///
    /// 之前的任务被取消，之前的通知槽被替换，因此旧的到期不会在重置后被观察到。
    /// The previous task is cancelled and its notification slot replaced, so a
    /// stale expiry is never observed after a reset.
    pub fn reset(&mut self, delay: Duration) -> Result<()> {
        let (tx, rx) = mpsc::channel(1);
        let handle = self.wheel.add(delay, notify(tx))?;

        let previous = std::mem::replace(&mut self.handle, handle);
        self.rx = rx;
        self.wheel.remove(&previous)
    }

    /// 停止定时器，幂等
    /// Stop the timer; idempotent
    pub fn stop(&self) -> Result<()> {
        self.wheel.remove(&self.handle)
    }

    /// 当前任务的ID，每次重置都会变化
    /// ID of the current task; changes on every reset
    pub fn id(&self) -> TaskId {
        self.handle.id()
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

/// 周期触发器
/// Periodic ticker
///
/// 每个周期产生一次通知，直到被停止。停止会唤醒正在 [`Ticker::recv`]
/// 中等待的消费者；通过 [`Ticker::stopper`] 可以在另一个任务中发出停止。
///
/// Produces a notification every period until stopped. Stopping wakes a
/// consumer waiting in [`Ticker::recv`]; [`Ticker::stopper`] lets another task
/// raise the stop.
#[derive(Debug)]
pub struct Ticker {
    stopper: TickerStopper,
    rx: mpsc::Receiver<()>,
}

/// 周期触发器的停止句柄
/// Stop handle of a ticker
#[derive(Debug, Clone)]
pub struct TickerStopper {
    wheel: TimeWheel,
    handle: TaskHandle,
    done_tx: Arc<watch::Sender<bool>>,
}

impl TickerStopper {
    /// 停止周期任务并发出停止信号，幂等
    /// Stop the repeating task and raise the stop signal; idempotent
    pub fn stop(&self) -> Result<()> {
        if self.done_tx.send_replace(true) {
            return Ok(());
        }
        self.wheel.remove(&self.handle)
    }

    /// 是否已停止
    /// Whether the ticker was stopped
    pub fn is_stopped(&self) -> bool {
        *self.done_tx.borrow()
    }

    /// 等待停止信号
    /// Wait for the stop signal
    pub async fn done(&self) {
        let mut done = self.done_tx.subscribe();
        let _ = done.wait_for(|stopped| *stopped).await;
    }
}

impl Ticker {
    /// 等待下一次通知，停止后返回 `None`
    /// Wait for the next notification; returns `None` once stopped
    pub async fn recv(&mut self) -> Option<()> {
        let mut done = self.stopper.done_tx.subscribe();
        if *done.borrow() {
            return None;
        }

        tokio::select! {
            biased;
            _ = done.wait_for(|stopped| *stopped) => None,
            signal = self.rx.recv() => signal,
        }
    }

    /// 非阻塞地检查是否有待取的通知
    /// Check for a pending notification without waiting
    pub fn try_recv(&mut self) -> bool {
        !self.is_stopped() && self.rx.try_recv().is_ok()
    }

    /// 停止周期任务并发出停止信号，幂等
    /// Stop the repeating task and raise the stop signal; idempotent
    pub fn stop(&self) -> Result<()> {
        self.stopper.stop()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopper.is_stopped()
    }

    /// 等待停止信号
    /// Wait for the stop signal
    pub async fn done(&self) {
        self.stopper.done().await
    }

    /// 返回可在其他任务中使用的停止句柄
    /// Return a stop handle usable from other tasks
    pub fn stopper(&self) -> TickerStopper {
        self.stopper.clone()
    }

    /// 周期任务的ID
    /// ID of the repeating task
    pub fn id(&self) -> TaskId {
        self.stopper.handle.id()
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

impl TimeWheel {
    /// 创建在 `delay` 之后到期的一次性定时器
    /// Create a one-shot timer that matures after `delay`
    pub fn new_timer(&self, delay: Duration) -> Result<Timer> {
        let (tx, rx) = mpsc::channel(1);
        let handle = self.add(delay, notify(tx))?;
        Ok(Timer {
            wheel: self.clone(),
            handle,
            rx,
        })
    }

    /// 创建每隔 `delay` 通知一次的周期触发器
    /// Create a ticker that notifies every `delay`
    pub fn new_ticker(&self, delay: Duration) -> Result<Ticker> {
        let (tx, rx) = mpsc::channel(1);
        let handle = self.add_cron(delay, notify(tx))?;
        let (done_tx, _) = watch::channel(false);
        Ok(Ticker {
            stopper: TickerStopper {
                wheel: self.clone(),
                handle,
                done_tx: Arc::new(done_tx),
            },
            rx,
        })
    }

    /// 返回一个在 `delay` 之后完成的接收端
    /// Return a receiver that completes after `delay`
    pub fn after(&self, delay: Duration) -> Result<oneshot::Receiver<()>> {
        let (tx, rx) = oneshot::channel();
        let slot = Mutex::new(Some(tx));
        self.add(delay, move || {
            let tx = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let Some(tx) = tx {
                let _ = tx.send(());
            }
        })?;
        Ok(rx)
    }

    /// 挂起当前任务 `delay`，精度为一个 tick
    /// Suspend the current task for `delay`, with tick precision
    pub async fn sleep(&self, delay: Duration) -> Result<()> {
        self.after(delay)?.await.map_err(|_| Error::WheelStopped)
    }
}

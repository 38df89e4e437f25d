//! 进程级默认时间轮
//! Process-wide default time wheel
//!
//! 默认时间轮使用 [`WheelConfig::default`]（1秒 tick，120个槽位），在第一次
//! 使用时于当前 tokio 运行时上创建并启动。若其控制循环已经退出（例如创建它的
//! 运行时已被关闭），下一次使用时会重新创建。
//!
//! The default wheel uses [`WheelConfig::default`] (1s tick, 120 buckets) and
//! is created and started on the current tokio runtime on first use. If its
//! control loop has exited, for instance because the runtime that created it
//! shut down, the next use creates a fresh one.

use crate::config::WheelConfig;
use crate::error::{Error, Result};
use crate::task::TimeWheel;
use crate::timer::{Ticker, Timer};
use crate::wheel::TaskHandle;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tokio::sync::oneshot;
use tracing::info;

static DEFAULT_WHEEL: RwLock<Option<TimeWheel>> = RwLock::new(None);

/// 获取默认时间轮，必要时创建并启动
/// Get the default wheel, creating and starting it when needed
pub fn default_wheel() -> Result<TimeWheel> {
    {
        let guard = DEFAULT_WHEEL.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(wheel) = guard.as_ref().filter(|wheel| !wheel.is_closed()) {
            return Ok(wheel.clone());
        }
    }

    let mut guard = DEFAULT_WHEEL.write().unwrap_or_else(PoisonError::into_inner);
    if let Some(wheel) = guard.as_ref().filter(|wheel| !wheel.is_closed()) {
        return Ok(wheel.clone());
    }

    let wheel = TimeWheel::with_config(WheelConfig::default())?;
    wheel.start()?;
    info!(tick_ms = wheel.tick().as_millis() as u64, "Default time wheel created");

    *guard = Some(wheel.clone());
    Ok(wheel)
}

/// 替换默认时间轮，返回之前的实例
/// Replace the default wheel, returning the previous instance
///
/// 尚未启动的时间轮会在当前运行时上启动，使自由函数提交的任务总能被处理。
/// 之前的实例不会被停止；其他持有者仍可继续使用它。
///
/// A wheel that was not started yet is started on the current runtime, so
/// work queued through the free functions always runs. The previous instance
/// is not stopped; other holders may keep using it.
///
/// # Errors
/// 时间轮已停止，或不在 tokio 运行时中时返回错误，默认实例保持不变。
/// Fails when the wheel was stopped or no tokio runtime is available; the
/// default instance is left unchanged.
pub fn reset_default(wheel: TimeWheel) -> Result<Option<TimeWheel>> {
    match wheel.start() {
        Ok(()) | Err(Error::AlreadyStarted) => {}
        Err(err) => return Err(err),
    }

    info!(
        tick_ms = wheel.tick().as_millis() as u64,
        bucket_count = wheel.bucket_count(),
        "Default time wheel replaced"
    );
    Ok(DEFAULT_WHEEL
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .replace(wheel))
}

/// 在默认时间轮上安排一次性任务
/// Schedule a one-shot task on the default wheel
pub fn add<F>(delay: Duration, callback: F) -> Result<TaskHandle>
where
    F: Fn() + Send + Sync + 'static,
{
    default_wheel()?.add(delay, callback)
}

/// 在默认时间轮上安排周期任务
/// Schedule a repeating task on the default wheel
pub fn add_cron<F>(delay: Duration, callback: F) -> Result<TaskHandle>
where
    F: Fn() + Send + Sync + 'static,
{
    default_wheel()?.add_cron(delay, callback)
}

/// 在默认时间轮上取消任务
/// Cancel a task on the default wheel
pub fn remove(handle: &TaskHandle) -> Result<()> {
    default_wheel()?.remove(handle)
}

pub fn new_timer(delay: Duration) -> Result<Timer> {
    default_wheel()?.new_timer(delay)
}

pub fn new_ticker(delay: Duration) -> Result<Ticker> {
    default_wheel()?.new_ticker(delay)
}

pub fn after(delay: Duration) -> Result<oneshot::Receiver<()>> {
    default_wheel()?.after(delay)
}

/// 在默认时间轮上挂起 `delay`
/// Suspend for `delay` on the default wheel
pub async fn sleep(delay: Duration) -> Result<()> {
    default_wheel()?.sleep(delay).await
}

//! 到期回调的派发
//! Dispatch of matured callbacks
//!
//! 每个到期回调都在独立的 tokio 任务中执行，控制循环从不等待它们完成。
//! 回调中的 panic 被捕获并交给 panic 钩子，永远不会影响控制循环。
//!
//! Every matured callback runs on its own tokio task and the control loop never
//! waits for it. A panic inside a callback is caught and handed to the panic
//! hook; it never reaches the control loop.

use crate::config::{DispatchConfig, DispatchMode};
use crate::wheel::{Callback, TaskId};
use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::error;

/// 回调 panic 钩子，参数为任务ID和 panic 信息
/// Callback panic hook, receives the task ID and the panic message
pub type PanicHook = Arc<dyn Fn(TaskId, &str) + Send + Sync + 'static>;

/// 回调派发器
/// Callback dispatcher
#[derive(Clone)]
pub(crate) struct Dispatcher {
    mode: DispatchMode,
    limiter: Option<Arc<Semaphore>>,
    panic_hook: PanicHook,
}

impl Dispatcher {
    pub(crate) fn new(config: &DispatchConfig) -> Self {
        let panic_hook = config
            .panic_hook
            .clone()
            .unwrap_or_else(|| Arc::new(log_panic) as PanicHook);

        Self {
            mode: config.mode,
            limiter: config.max_in_flight.map(|n| Arc::new(Semaphore::new(n))),
            panic_hook,
        }
    }

    /// 派发回调，立即返回
    /// Dispatch a callback and return immediately
    pub(crate) fn dispatch(&self, id: TaskId, callback: Callback) {
        let limiter = self.limiter.clone();
        let hook = Arc::clone(&self.panic_hook);

        match self.mode {
            DispatchMode::Spawn => {
                tokio::spawn(async move {
                    let _permit = acquire(limiter).await;
                    run_guarded(id, &callback, &hook);
                });
            }
            DispatchMode::Blocking => match limiter {
                None => {
                    tokio::task::spawn_blocking(move || run_guarded(id, &callback, &hook));
                }
                Some(limiter) => {
                    tokio::spawn(async move {
                        let permit = acquire(Some(limiter)).await;
                        let _ = tokio::task::spawn_blocking(move || {
                            let _permit = permit;
                            run_guarded(id, &callback, &hook);
                        })
                        .await;
                    });
                }
            },
        }
    }
}

async fn acquire(limiter: Option<Arc<Semaphore>>) -> Option<OwnedSemaphorePermit> {
    match limiter {
        Some(semaphore) => semaphore.acquire_owned().await.ok(),
        None => None,
    }
}

fn run_guarded(id: TaskId, callback: &Callback, hook: &PanicHook) {
    if let Err(payload) = catch_unwind(AssertUnwindSafe(|| (callback.as_ref())())) {
        let message = panic_message(payload.as_ref());
        hook(id, &message);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

fn log_panic(id: TaskId, message: &str) {
    error!(task_id = %id, panic = message, "Time wheel callback panicked");
}

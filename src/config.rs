//! 定义了时间轮的可配置参数。
//! Defines configurable parameters for the time wheel.

use crate::error::{Error, Result};
use crate::task::dispatch::PanicHook;
use std::fmt;
use std::time::Duration;

/// A structure containing all configurable parameters for a time wheel.
///
/// 包含时间轮所有可配置参数的结构体。
#[derive(Debug, Clone)]
pub struct WheelConfig {
    /// The fixed duration between two pointer advances. Every delay is
    /// quantized to a multiple of this value.
    ///
    /// 两次指针推进之间的固定时长。所有延迟都会被量化为它的整数倍。
    pub tick: Duration,

    /// The number of buckets in the circular array. `tick * bucket_count` is
    /// the longest delay that fits into a single revolution.
    ///
    /// 环形数组中的槽位数量。`tick * bucket_count` 是单圈能表示的最长延迟。
    pub bucket_count: usize,

    /// Callback dispatch parameters.
    /// 回调派发参数。
    pub dispatch: DispatchConfig,
}

/// How matured callbacks are executed.
///
/// 到期回调的执行方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DispatchMode {
    /// Each callback runs on its own `tokio::spawn`ed task.
    /// 每个回调运行在独立的 `tokio::spawn` 任务中。
    #[default]
    Spawn,
    /// Each callback runs on tokio's blocking thread pool. Use this when
    /// callbacks may block the calling thread.
    ///
    /// 每个回调运行在 tokio 的阻塞线程池中。当回调可能阻塞线程时使用。
    Blocking,
}

/// Callback dispatch parameters.
///
/// 回调派发参数。
#[derive(Clone, Default)]
pub struct DispatchConfig {
    /// Where callbacks run.
    /// 回调运行的位置。
    pub mode: DispatchMode,
    /// Upper bound on callbacks running at the same time. `None` leaves
    /// dispatch unbounded.
    ///
    /// 同时运行的回调数量上限。`None` 表示不做限制。
    pub max_in_flight: Option<usize>,
    /// Invoked with the task id and panic message whenever a callback panics.
    /// When unset, the panic is logged at `error` level.
    ///
    /// 回调 panic 时以任务ID和 panic 信息调用。未设置时以 `error` 级别记录日志。
    pub panic_hook: Option<PanicHook>,
}

impl fmt::Debug for DispatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchConfig")
            .field("mode", &self.mode)
            .field("max_in_flight", &self.max_in_flight)
            .field("panic_hook", &self.panic_hook.as_ref().map(|_| "<hook>"))
            .finish()
    }
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            bucket_count: 120,
            dispatch: DispatchConfig::default(),
        }
    }
}

impl WheelConfig {
    /// Creates a configuration builder seeded with the defaults.
    ///
    /// 创建以默认值初始化的配置构建器。
    pub fn builder() -> WheelConfigBuilder {
        WheelConfigBuilder::default()
    }

    /// Checks every field and reports the first invalid one.
    ///
    /// 检查所有字段并报告第一个无效字段。
    pub fn validate(&self) -> Result<()> {
        if self.tick.is_zero() {
            return Err(Error::InvalidConfiguration {
                field: "tick",
                reason: "tick must be greater than zero",
            });
        }
        if self.bucket_count == 0 {
            return Err(Error::InvalidConfiguration {
                field: "bucket_count",
                reason: "bucket count must be greater than zero",
            });
        }
        if self.dispatch.max_in_flight == Some(0) {
            return Err(Error::InvalidConfiguration {
                field: "max_in_flight",
                reason: "in-flight bound must be greater than zero",
            });
        }
        Ok(())
    }
}

/// Builder for [`WheelConfig`].
///
/// [`WheelConfig`] 的构建器。
#[derive(Debug, Clone, Default)]
pub struct WheelConfigBuilder {
    config: WheelConfig,
}

impl WheelConfigBuilder {
    /// Sets the tick duration.
    pub fn tick(mut self, tick: Duration) -> Self {
        self.config.tick = tick;
        self
    }

    /// Sets the number of buckets.
    pub fn bucket_count(mut self, bucket_count: usize) -> Self {
        self.config.bucket_count = bucket_count;
        self
    }

    /// Sets the dispatch mode.
    pub fn dispatch_mode(mut self, mode: DispatchMode) -> Self {
        self.config.dispatch.mode = mode;
        self
    }

    /// Bounds the number of callbacks running at the same time.
    pub fn max_in_flight(mut self, limit: usize) -> Self {
        self.config.dispatch.max_in_flight = Some(limit);
        self
    }

    /// Installs a hook that observes panicking callbacks.
    pub fn panic_hook(mut self, hook: PanicHook) -> Self {
        self.config.dispatch.panic_hook = Some(hook);
        self
    }

    /// Validates and returns the configuration.
    ///
    /// 校验并返回配置。
    pub fn build(self) -> Result<WheelConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//! 定义了库中所有可能的错误类型。
//! Defines all possible error types in the library.

use std::time::Duration;
use thiserror::Error;

/// The primary error type for the timing wheel library.
/// 时间轮库的主要错误类型。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A configuration value was rejected at construction time. No wheel is
    /// created when this is returned.
    ///
    /// 构造时某个配置值被拒绝。返回此错误时不会创建任何时间轮。
    #[error("invalid configuration for `{field}`: {reason}")]
    InvalidConfiguration {
        field: &'static str,
        reason: &'static str,
    },

    /// A zero delay was passed to a scheduling call. The call is rejected
    /// before anything is submitted to the control loop.
    ///
    /// 调度调用收到了零延迟。调用会在提交给控制循环之前被拒绝。
    #[error("invalid delay {0:?}: delay must be greater than zero")]
    InvalidDelay(Duration),

    /// The control loop of this wheel has already been started.
    /// 该时间轮的控制循环已经启动。
    #[error("time wheel is already started")]
    AlreadyStarted,

    /// `start` was called outside of a tokio runtime.
    /// `start` 在 tokio 运行时之外被调用。
    #[error("no tokio runtime available to drive the time wheel")]
    RuntimeUnavailable,

    /// The wheel has been stopped, or its control loop has exited and no
    /// longer drains its queues.
    ///
    /// 时间轮已被停止，或其控制循环已退出且不再消费队列。
    #[error("time wheel is stopped")]
    WheelStopped,

    /// An internal reply channel was dropped before answering.
    /// 内部应答通道在回复前被丢弃。
    #[error("Internal channel is broken")]
    ChannelClosed,
}

/// A specialized `Result` type for this library.
/// 本库专用的 `Result` 类型。
pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for std::io::Error {
    fn from(err: Error) -> Self {
        use std::io::ErrorKind;
        let kind = match err {
            Error::InvalidConfiguration { .. } => ErrorKind::InvalidInput,
            Error::InvalidDelay(_) => ErrorKind::InvalidInput,
            Error::AlreadyStarted => ErrorKind::AlreadyExists,
            Error::RuntimeUnavailable => ErrorKind::Unsupported,
            Error::WheelStopped => ErrorKind::NotConnected,
            Error::ChannelClosed => ErrorKind::BrokenPipe,
        };
        std::io::Error::new(kind, err)
    }
}

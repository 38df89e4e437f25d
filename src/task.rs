//! 时间轮控制任务模块
//! Time wheel control task module
//!
//! 本模块把纯数据结构 [`TimingWheel`](crate::wheel::TimingWheel) 包装为一个
//! 运行在 tokio 上的 actor：
//!
//! - `control`: 控制循环，独占时间轮并按 tick 推进
//! - `handle`: 客户端句柄 [`TimeWheel`]
//! - `dispatch`: 到期回调的派发与 panic 隔离
//! - `commands`: 需要应答的查询命令与统计信息
//!
//! This module wraps the pure [`TimingWheel`](crate::wheel::TimingWheel) data
//! structure into an actor running on tokio:
//!
//! - `control`: the control loop that owns the wheel and advances it per tick
//! - `handle`: the client handle [`TimeWheel`]
//! - `dispatch`: dispatch of matured callbacks and panic isolation
//! - `commands`: request/response queries and statistics

pub mod commands;
mod control;
pub mod dispatch;
mod handle;

pub use commands::WheelStats;
pub use dispatch::PanicHook;
pub use handle::TimeWheel;

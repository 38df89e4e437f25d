#![deny(clippy::expect_used, clippy::unwrap_used)]

//! The root of the hashed timing wheel library.
//! 哈希时间轮库的根。
//!
//! 一个时间轮由固定数量的槽位和固定的 tick 组成，单个控制循环在 tokio 上
//! 推进它并派发到期回调。在此之上提供一次性定时器、周期触发器，以及一个
//! 进程级的默认实例。
//!
//! A wheel is made of a fixed number of buckets and a fixed tick; a single
//! control loop advances it on tokio and dispatches matured callbacks. On top
//! of that sit one-shot timers, periodic tickers, and a process-wide default
//! instance.
//!
//! ```no_run
//! use kestrel_timewheel::TimeWheel;
//! use std::time::Duration;
//!
//! # async fn demo() -> kestrel_timewheel::Result<()> {
//! let wheel = TimeWheel::new(Duration::from_millis(10), 512)?;
//! wheel.start()?;
//!
//! let handle = wheel.add(Duration::from_millis(50), || println!("fired"))?;
//! wheel.remove(&handle)?;
//!
//! let mut ticker = wheel.new_ticker(Duration::from_millis(20))?;
//! ticker.recv().await;
//! ticker.stop()?;
//!
//! wheel.shutdown().await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod global;
pub mod task;
pub mod timer;
pub mod wheel;

pub use config::{DispatchConfig, DispatchMode, WheelConfig, WheelConfigBuilder};
pub use error::{Error, Result};
pub use task::{PanicHook, TimeWheel, WheelStats};
pub use timer::{Ticker, TickerStopper, Timer};
pub use wheel::{TaskHandle, TaskId};

//! 时间轮占用情况快照
//! Timing wheel occupancy snapshot

use std::time::Duration;

/// 时间轮占用情况快照
/// Timing wheel occupancy snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingWheelStats {
    pub bucket_count: usize,
    /// 至少含有一个任务的槽位数
    /// Buckets holding at least one task
    pub occupied_buckets: usize,
    pub pending_tasks: usize,
    /// 其中的周期任务数
    /// How many of the pending tasks repeat
    pub repeating_tasks: usize,
    /// 单个槽位中的最多任务数，衡量哈希分布是否均匀
    /// Most tasks found in one bucket, a measure of how evenly tasks spread
    pub largest_bucket: usize,
    /// 下一次 tick 将访问的槽位
    /// Bucket the next tick visits
    pub current_index: usize,
    pub tick: Duration,
}

impl TimingWheelStats {
    /// 单圈覆盖的时长，超过它的延迟需要额外的轮数
    /// Time covered by one revolution; longer delays need extra rounds
    pub fn revolution(&self) -> Duration {
        self.tick
            .saturating_mul(u32::try_from(self.bucket_count).unwrap_or(u32::MAX))
    }
}

impl std::fmt::Display for TimingWheelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} pending ({} repeating) in {}/{} buckets, largest {}, next {}, tick {:?}",
            self.pending_tasks,
            self.repeating_tasks,
            self.occupied_buckets,
            self.bucket_count,
            self.largest_bucket,
            self.current_index,
            self.tick
        )
    }
}

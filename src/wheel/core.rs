//! 时间轮核心实现
//! Timing wheel core implementation

use crate::error::{Error, Result};
use crate::wheel::stats::TimingWheelStats;
use crate::wheel::task::{Expired, Task, TaskId};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// 时间轮实现
/// Timing wheel implementation
///
/// 该结构本身不含任何同步原语，只能由唯一的所有者（控制循环）修改。
///
/// The structure holds no synchronization of its own and must only be
/// mutated by its single owner, the control loop.
#[derive(Debug)]
pub struct TimingWheel {
    /// 每次指针推进的时间间隔
    /// Time between two pointer advances
    tick: Duration,
    /// 槽位数量
    /// Number of buckets
    bucket_count: usize,
    /// 槽位数组，每个槽位以任务ID为键保存任务
    /// Bucket array, each bucket keyed by task ID
    buckets: Vec<HashMap<TaskId, Task>>,
    /// 任务ID到槽位下标的映射，用于O(1)取消
    /// Task ID to bucket index mapping for O(1) cancellation
    bucket_index: HashMap<TaskId, usize>,
    /// 下一次 tick 将访问的槽位
    /// Bucket visited by the next tick
    current_index: usize,
}

impl TimingWheel {
    /// 创建新的时间轮
    /// Create new timing wheel
    ///
    /// # Errors
    /// `tick` 为零或 `bucket_count` 为零时返回 [`Error::InvalidConfiguration`]。
    /// Returns [`Error::InvalidConfiguration`] when `tick` or `bucket_count` is zero.
    pub fn new(tick: Duration, bucket_count: usize) -> Result<Self> {
        if tick.is_zero() {
            return Err(Error::InvalidConfiguration {
                field: "tick",
                reason: "tick must be greater than zero",
            });
        }
        if bucket_count == 0 {
            return Err(Error::InvalidConfiguration {
                field: "bucket_count",
                reason: "bucket count must be greater than zero",
            });
        }

        let mut buckets = Vec::with_capacity(bucket_count);
        buckets.resize_with(bucket_count, HashMap::new);

        Ok(Self {
            tick,
            bucket_count,
            buckets,
            bucket_index: HashMap::new(),
            current_index: 0,
        })
    }

    pub fn tick(&self) -> Duration {
        self.tick
    }

    pub fn bucket_count(&self) -> usize {
        self.bucket_count
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    /// 待触发任务数量
    /// Number of pending tasks
    pub fn len(&self) -> usize {
        self.bucket_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bucket_index.is_empty()
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.bucket_index.contains_key(&id)
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        let index = self.bucket_index.get(&id)?;
        self.buckets[*index].get(&id)
    }

    /// 将延迟量化为 tick 数，不足一个 tick 的部分被截断
    /// Quantize a delay to whole ticks, truncating any remainder
    fn ticks_for(&self, delay: Duration) -> usize {
        let ticks = delay.as_nanos() / self.tick.as_nanos();
        usize::try_from(ticks).unwrap_or(usize::MAX)
    }

    /// 计算相对于下一次 tick 的放置位置
    /// Compute placement relative to the bucket the next tick visits
    ///
    /// # Returns
    /// `(index, round)`：`index = (current + ticks) % bucket_count`，
    /// `round = ticks / bucket_count`
    pub fn placement(&self, delay: Duration) -> (usize, usize) {
        let ticks = self.ticks_for(delay);
        let index = (self.current_index + ticks % self.bucket_count) % self.bucket_count;
        (index, ticks / self.bucket_count)
    }

    /// 周期任务重新放置时使用：此时被访问的槽位代表"现在"
    /// Used when requeueing a repeating task: the bucket being visited is "now"
    fn requeue_placement(&self, delay: Duration) -> (usize, usize) {
        let ticks = self.ticks_for(delay).max(1);
        let index = (self.current_index + ticks % self.bucket_count) % self.bucket_count;
        (index, (ticks - 1) / self.bucket_count)
    }

    /// 添加任务到时间轮
    /// Add task to timing wheel
    ///
    /// # Returns
    /// 如果任务在放置前已被停止则丢弃并返回false
    /// Returns false if the task was already stopped and got dropped
    pub fn insert(&mut self, mut task: Task) -> bool {
        if task.is_stopped() {
            trace!(task_id = %task.id, "Dropped stopped task before placement");
            return false;
        }

        let (index, round) = self.placement(task.delay);
        task.round = round;

        trace!(
            task_id = %task.id,
            index,
            round,
            delay_ms = task.delay.as_millis(),
            "Added task to timing wheel"
        );

        self.place(index, task);
        true
    }

    fn place(&mut self, index: usize, task: Task) {
        let id = task.id;
        if let Some(previous) = self.bucket_index.insert(id, index) {
            if previous != index {
                self.buckets[previous].remove(&id);
            }
        }
        self.buckets[index].insert(id, task);
    }

    /// 取消任务
    /// Cancel task
    ///
    /// # Returns
    /// 任务不存在（已到期或已取消）时返回None
    /// Returns None if the task is unknown (already matured or cancelled)
    pub fn remove(&mut self, id: TaskId) -> Option<Task> {
        let index = self.bucket_index.remove(&id)?;
        let task = self.buckets[index].remove(&id);
        trace!(task_id = %id, index, "Removed task from timing wheel");
        task
    }

    /// 推进一个 tick 并返回到期的任务
    /// Advance by one tick and return the matured tasks
    ///
    /// 访问当前槽位：轮数大于零的任务轮数减一并留在原处；轮数为零的任务到期，
    /// 周期任务以原延迟重新放置，其余任务被移除。最后指针前进一格。
    ///
    /// Visits the current bucket: tasks with rounds left lose one and stay;
    /// tasks at round zero mature, repeating ones are placed again with their
    /// original delay, the rest are dropped. The pointer then moves one bucket.
    pub fn advance(&mut self) -> Vec<Expired> {
        let index = self.current_index;
        let bucket = std::mem::take(&mut self.buckets[index]);

        let mut expired = Vec::new();
        let mut requeue = Vec::new();
        let mut remaining = HashMap::with_capacity(bucket.len());

        for (id, mut task) in bucket {
            if task.is_stopped() {
                self.bucket_index.remove(&id);
                continue;
            }

            if task.round > 0 {
                task.round -= 1;
                remaining.insert(id, task);
                continue;
            }

            expired.push(Expired {
                id,
                callback: Arc::clone(&task.callback),
                requeued: task.repeating,
            });

            if task.repeating {
                requeue.push(task);
            } else {
                self.bucket_index.remove(&id);
            }
        }

        self.buckets[index] = remaining;

        for mut task in requeue {
            let (next_index, round) = self.requeue_placement(task.delay);
            task.round = round;
            self.place(next_index, task);
        }

        self.current_index = (index + 1) % self.bucket_count;

        if !expired.is_empty() {
            trace!(index, expired = expired.len(), "Bucket matured tasks");
        }

        expired
    }

    /// 清空所有任务，返回被清除的数量
    /// Clear all tasks, returning how many were dropped
    pub fn clear(&mut self) -> usize {
        let count = self.bucket_index.len();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
        self.bucket_index.clear();
        count
    }

    /// 获取时间轮统计信息
    /// Get timing wheel statistics
    pub fn stats(&self) -> TimingWheelStats {
        let occupied_buckets = self.buckets.iter().filter(|b| !b.is_empty()).count();
        let largest_bucket = self.buckets.iter().map(HashMap::len).max().unwrap_or(0);
        let repeating_tasks = self
            .buckets
            .iter()
            .flat_map(HashMap::values)
            .filter(|task| task.repeating)
            .count();

        TimingWheelStats {
            bucket_count: self.bucket_count,
            occupied_buckets,
            pending_tasks: self.len(),
            repeating_tasks,
            largest_bucket,
            current_index: self.current_index,
            tick: self.tick,
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let total: usize = self.buckets.iter().map(HashMap::len).sum();
        assert_eq!(total, self.bucket_index.len());
        for (index, bucket) in self.buckets.iter().enumerate() {
            for id in bucket.keys() {
                assert_eq!(self.bucket_index.get(id), Some(&index));
            }
        }
    }
}

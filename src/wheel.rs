//! 时间轮数据结构实现
//! Timing Wheel Data Structure Implementation
//!
//! 时间轮是一个环形槽位数组，每个 tick 指针前进一格并处理所指槽位中的任务。
//! 超出单圈范围的延迟通过轮数（round）表示。插入与取消都是O(1)，
//! 每个 tick 的开销只与被访问槽位中的任务数成正比。
//!
//! The timing wheel is a circular array of buckets. On every tick the pointer
//! moves one bucket forward and processes the tasks found there. Delays longer
//! than one revolution are expressed as a number of remaining rounds.
//! Insertion and cancellation are O(1); the cost of a tick is proportional to
//! the size of the visited bucket only.

mod core;
mod stats;
mod task;

pub use core::TimingWheel;
pub use stats::TimingWheelStats;
pub use task::{Callback, Expired, Task, TaskHandle, TaskId};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_callback(counter: &Arc<AtomicUsize>) -> Callback {
        let counter = Arc::clone(counter);
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    /// 推进 n 次并执行所有到期回调，返回到期任务数
    fn advance_and_run(wheel: &mut TimingWheel, n: usize) -> usize {
        let mut fired = 0;
        for _ in 0..n {
            for expired in wheel.advance() {
                (expired.callback)();
                fired += 1;
            }
            wheel.assert_consistent();
        }
        fired
    }

    fn one_second_wheel(buckets: usize) -> TimingWheel {
        TimingWheel::new(Duration::from_secs(1), buckets).unwrap()
    }

    #[test]
    fn test_timing_wheel_creation() {
        let wheel = one_second_wheel(8);
        assert_eq!(wheel.bucket_count(), 8);
        assert_eq!(wheel.tick(), Duration::from_secs(1));
        assert_eq!(wheel.current_index(), 0);
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_invalid_configuration() {
        assert!(matches!(
            TimingWheel::new(Duration::ZERO, 8),
            Err(Error::InvalidConfiguration { field: "tick", .. })
        ));
        assert!(matches!(
            TimingWheel::new(Duration::from_secs(1), 0),
            Err(Error::InvalidConfiguration {
                field: "bucket_count",
                ..
            })
        ));
    }

    #[test]
    fn test_two_second_task_placement_and_firing() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));

        assert_eq!(wheel.placement(Duration::from_secs(2)), (2, 0));
        let task = Task::once(TaskId::new(1), Duration::from_secs(2), counting_callback(&counter));
        assert!(wheel.insert(task));
        wheel.assert_consistent();

        // 第一次推进结束提交时所在的部分 tick，随后两个完整 tick 后到期
        assert_eq!(advance_and_run(&mut wheel, 2), 0);
        assert_eq!(advance_and_run(&mut wheel, 1), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        // 一次性任务不会再次触发
        assert_eq!(advance_and_run(&mut wheel, 8), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_ten_second_task_needs_rounds() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let id = TaskId::new(1);

        assert_eq!(wheel.placement(Duration::from_secs(10)), (2, 2));
        wheel.insert(Task::once(id, Duration::from_secs(10), counting_callback(&counter)));
        assert_eq!(wheel.get(id).map(Task::round), Some(2));

        // 第一次访问槽位2：轮数减为1
        assert_eq!(advance_and_run(&mut wheel, 3), 0);
        assert_eq!(wheel.get(id).map(Task::round), Some(1));

        // 第二次访问：轮数减为0
        assert_eq!(advance_and_run(&mut wheel, 4), 0);
        assert_eq!(wheel.get(id).map(Task::round), Some(0));

        // 第三次访问：到期
        assert_eq!(advance_and_run(&mut wheel, 3), 0);
        assert_eq!(advance_and_run(&mut wheel, 1), 1);
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(!wheel.contains(id));
    }

    #[test]
    fn test_placement_wraps_around() {
        let mut wheel = one_second_wheel(4);
        advance_and_run(&mut wheel, 3);
        assert_eq!(wheel.current_index(), 3);

        assert_eq!(wheel.placement(Duration::from_secs(2)), (1, 0));
        assert_eq!(wheel.placement(Duration::from_secs(4)), (3, 1));
        assert_eq!(wheel.placement(Duration::from_secs(9)), (0, 2));
    }

    #[test]
    fn test_delay_is_truncated_to_whole_ticks() {
        let wheel = one_second_wheel(8);
        assert_eq!(wheel.placement(Duration::from_millis(2900)), (2, 0));
        assert_eq!(wheel.placement(Duration::from_millis(999)), (0, 0));

        let wheel = TimingWheel::new(Duration::from_millis(250), 8).unwrap();
        assert_eq!(wheel.placement(Duration::from_millis(600)), (2, 0));
    }

    #[test]
    fn test_sub_tick_delay_fires_on_next_tick() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));

        wheel.insert(Task::once(TaskId::new(1), Duration::from_millis(300), counting_callback(&counter)));
        assert_eq!(advance_and_run(&mut wheel, 1), 1);
    }

    #[test]
    fn test_full_revolution_delay() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));

        assert_eq!(wheel.placement(Duration::from_secs(4)), (0, 1));
        wheel.insert(Task::once(TaskId::new(1), Duration::from_secs(4), counting_callback(&counter)));

        assert_eq!(advance_and_run(&mut wheel, 4), 0);
        assert_eq!(advance_and_run(&mut wheel, 1), 1);
    }

    #[test]
    fn test_repeating_task_period() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let id = TaskId::new(1);

        wheel.insert(Task::repeat(id, Duration::from_secs(2), counting_callback(&counter)));

        let mut fired_at = Vec::new();
        for step in 1..=11 {
            let expired = wheel.advance();
            wheel.assert_consistent();
            for e in &expired {
                assert_eq!(e.id, id);
                assert!(e.requeued);
                (e.callback)();
                fired_at.push(step);
            }
        }

        assert_eq!(fired_at, vec![3, 5, 7, 9, 11]);
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert!(wheel.contains(id));
    }

    #[test]
    fn test_repeating_full_revolution_period() {
        let mut wheel = one_second_wheel(4);
        let id = TaskId::new(1);
        wheel.insert(Task::repeat(id, Duration::from_secs(4), Arc::new(|| {})));

        let fired_at: Vec<usize> = (1..=13)
            .filter(|_| !wheel.advance().is_empty())
            .collect();
        assert_eq!(fired_at, vec![5, 9, 13]);
    }

    #[test]
    fn test_repeating_sub_tick_fires_every_tick() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        wheel.insert(Task::repeat(TaskId::new(1), Duration::from_millis(100), counting_callback(&counter)));

        assert_eq!(advance_and_run(&mut wheel, 6), 6);
        assert_eq!(wheel.len(), 1);
    }

    #[test]
    fn test_remove_task() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let id = TaskId::new(1);

        wheel.insert(Task::once(id, Duration::from_secs(1), counting_callback(&counter)));
        assert!(wheel.remove(id).is_some());
        wheel.assert_consistent();

        // 重复取消是空操作
        assert!(wheel.remove(id).is_none());
        assert!(wheel.remove(TaskId::new(999)).is_none());

        assert_eq!(advance_and_run(&mut wheel, 8), 0);
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_remove_repeating_task() {
        let mut wheel = one_second_wheel(4);
        let id = TaskId::new(1);
        wheel.insert(Task::repeat(id, Duration::from_secs(1), Arc::new(|| {})));

        assert_eq!(advance_and_run(&mut wheel, 4), 3);
        assert!(wheel.remove(id).is_some());
        assert_eq!(advance_and_run(&mut wheel, 8), 0);
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_stopped_task_is_dropped_on_visit() {
        let mut wheel = one_second_wheel(4);
        let counter = Arc::new(AtomicUsize::new(0));
        let task = Task::once(TaskId::new(1), Duration::from_secs(1), counting_callback(&counter));
        let handle = task.handle();

        wheel.insert(task);
        handle.mark_stopped();

        assert_eq!(advance_and_run(&mut wheel, 4), 0);
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_stopped_task_is_not_placed() {
        let mut wheel = one_second_wheel(4);
        let task = Task::once(TaskId::new(1), Duration::from_secs(1), Arc::new(|| {}));
        task.handle().mark_stopped();

        assert!(!wheel.insert(task));
        assert!(wheel.is_empty());
    }

    #[test]
    fn test_multiple_tasks_same_bucket() {
        let mut wheel = one_second_wheel(8);

        for i in 1..=5 {
            wheel.insert(Task::once(TaskId::new(i), Duration::from_secs(3), Arc::new(|| {})));
        }
        assert_eq!(wheel.stats().occupied_buckets, 1);

        advance_and_run(&mut wheel, 3);
        let expired = wheel.advance();

        // 同一槽位内的触发顺序不做保证，只比较集合
        let ids: HashSet<u64> = expired.iter().map(|e| e.id.as_u64()).collect();
        assert_eq!(ids, (1..=5).collect());
    }

    #[test]
    fn test_stats_and_clear() {
        let mut wheel = one_second_wheel(8);

        let stats = wheel.stats();
        assert_eq!(stats.bucket_count, 8);
        assert_eq!(stats.occupied_buckets, 0);
        assert_eq!(stats.pending_tasks, 0);
        assert_eq!(stats.revolution(), Duration::from_secs(8));

        for i in 0..16u64 {
            wheel.insert(Task::once(TaskId::new(i + 1), Duration::from_secs(i), Arc::new(|| {})));
        }
        wheel.insert(Task::repeat(TaskId::new(100), Duration::from_secs(3), Arc::new(|| {})));

        let stats = wheel.stats();
        assert_eq!(stats.occupied_buckets, 8);
        assert_eq!(stats.pending_tasks, 17);
        assert_eq!(stats.repeating_tasks, 1);
        assert_eq!(stats.largest_bucket, 3);
        assert_eq!(
            stats.to_string(),
            "17 pending (1 repeating) in 8/8 buckets, largest 3, next 0, tick 1s"
        );

        assert_eq!(wheel.clear(), 17);
        assert!(wheel.is_empty());
        let stats = wheel.stats();
        assert_eq!(stats.occupied_buckets, 0);
        assert_eq!(stats.repeating_tasks, 0);
    }

    #[test]
    fn test_large_scale_insert_and_cancel() {
        let mut wheel = TimingWheel::new(Duration::from_millis(10), 512).unwrap();
        let count = 1000u64;

        for i in 1..=count {
            let delay = Duration::from_millis((i % 100 + 1) * 10);
            wheel.insert(Task::once(TaskId::new(i), delay, Arc::new(|| {})));
        }
        assert_eq!(wheel.len(), count as usize);

        let cancelled = (1..=count)
            .step_by(2)
            .filter(|i| wheel.remove(TaskId::new(*i)).is_some())
            .count();
        assert_eq!(cancelled, (count / 2) as usize);
        wheel.assert_consistent();

        let fired = advance_and_run(&mut wheel, 512);
        assert_eq!(fired, (count / 2) as usize);
        assert!(wheel.is_empty());
    }
}

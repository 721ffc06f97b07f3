//! 动作节奏控制
//!
//! 在同一账号的连续远程动作之间插入随机延迟，
//! 避免形成容易被识别的突发请求模式。

use std::time::Duration;

use rand::Rng;
use tokio::time::sleep;

use crate::config::DelayRange;

/// 单次私聊类动作之间的固定小延迟区间（秒）
pub const DIRECT_ACTION_DELAY: DelayRange = DelayRange(2, 5);

/// 在 [min, max] 内均匀取一个秒数并挂起当前任务
pub async fn pace(range: DelayRange) {
    let secs = sample_secs(range);
    sleep(Duration::from_secs(secs)).await;
}

fn sample_secs(range: DelayRange) -> u64 {
    let (min, max) = (range.min_secs(), range.max_secs());
    if max <= min {
        min
    } else {
        rand::rng().random_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_within_bounds() {
        for _ in 0..100 {
            let secs = sample_secs(DelayRange(3, 7));
            assert!((3..=7).contains(&secs));
        }
    }

    #[test]
    fn test_sample_degenerate_range() {
        assert_eq!(sample_secs(DelayRange(4, 4)), 4);
        // 上界小于下界时取下界，不会 panic
        assert_eq!(sample_secs(DelayRange(9, 2)), 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pace_sleeps_for_sampled_duration() {
        let start = tokio::time::Instant::now();
        pace(DelayRange(3, 3)).await;
        assert!(start.elapsed() >= Duration::from_secs(3));
    }
}

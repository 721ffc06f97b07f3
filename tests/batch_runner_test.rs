//! 批次调度器的并发语义测试

use std::sync::{Arc, Mutex};
use std::time::Duration;

use multi_client_ops::models::{SelectionSet, TaskResult};
use multi_client_ops::orchestrator::{run_batches, CancelToken};
use multi_client_ops::services::BufferChannel;
use multi_client_ops::AccountHandle;

fn selection_of(count: usize) -> SelectionSet {
    let snapshot: Vec<AccountHandle> = (0..count)
        .map(|i| AccountHandle::new(format!("acc{}", i + 1), "session"))
        .collect();
    SelectionSet::from_indices((0..count).collect(), &snapshot)
}

#[tokio::test]
async fn test_all_accounts_run_exactly_once() {
    let selection = selection_of(5);
    let channel = BufferChannel::new();
    let cancel = CancelToken::new();
    let invoked: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    let invoked_clone = Arc::clone(&invoked);
    let summary = run_batches(&selection, 2, &cancel, &channel, 1, move |pos, account, _| {
        let invoked = Arc::clone(&invoked_clone);
        async move {
            invoked.lock().expect("锁中毒").push(pos);
            TaskResult::ok(account.name, 1)
        }
    })
    .await
    .expect("调度失败");

    assert_eq!(summary.launched(), 5);
    assert_eq!(summary.succeeded(), 5);
    assert_eq!(summary.failed(), 0);
    // 5 个账号宽度 2 应该是 3 批
    assert_eq!(summary.batches_completed(), 3);

    let mut positions = invoked.lock().expect("锁中毒").clone();
    positions.sort_unstable();
    assert_eq!(positions, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn test_failure_does_not_abort_siblings() {
    let selection = selection_of(4);
    let channel = BufferChannel::new();
    let cancel = CancelToken::new();

    let summary = run_batches(&selection, 4, &cancel, &channel, 1, |pos, account, _| {
        async move {
            if pos % 2 == 0 {
                TaskResult::failure(account.name, "模拟失败")
            } else {
                TaskResult::ok(account.name, 1)
            }
        }
    })
    .await
    .expect("调度失败");

    // 同批内的失败互不影响：所有任务都有终态
    assert_eq!(summary.launched(), 4);
    assert_eq!(summary.succeeded(), 2);
    assert_eq!(summary.failed(), 2);
    assert_eq!(summary.failures().len(), 2);
    assert!(summary
        .failures()
        .iter()
        .all(|(_, detail)| detail == "模拟失败"));
}

#[tokio::test]
async fn test_cancel_after_first_batch_stops_later_batches() {
    let selection = selection_of(6);
    let channel = BufferChannel::new();
    let cancel = CancelToken::new();
    let invoked: Arc<Mutex<Vec<usize>>> = Arc::new(Mutex::new(Vec::new()));

    let invoked_clone = Arc::clone(&invoked);
    let summary = run_batches(&selection, 2, &cancel, &channel, 1, move |pos, account, token| {
        let invoked = Arc::clone(&invoked_clone);
        async move {
            invoked.lock().expect("锁中毒").push(pos);
            // 第一批的任务内部请求取消
            token.request();
            TaskResult::ok(account.name, 1)
        }
    })
    .await
    .expect("调度失败");

    // 统计只反映第一批，后续批次从未启动任何任务
    assert!(summary.cancelled());
    assert_eq!(summary.batches_completed(), 1);
    assert_eq!(summary.launched(), 2);
    assert_eq!(summary.succeeded() + summary.failed(), summary.launched());

    let positions = invoked.lock().expect("锁中毒").clone();
    assert_eq!(positions.len(), 2);
    assert!(positions.iter().all(|&p| p < 2));

    // 操作员收到了取消播报
    let messages = channel.drain();
    assert!(messages.iter().any(|(_, m)| m.contains("取消")));
}

#[tokio::test]
async fn test_results_attributed_regardless_of_completion_order() {
    let selection = selection_of(3);
    let channel = BufferChannel::new();
    let cancel = CancelToken::new();

    let summary = run_batches(&selection, 3, &cancel, &channel, 1, |pos, account, _| {
        async move {
            // 位置越靠前睡得越久，完成顺序与启动顺序相反
            tokio::time::sleep(Duration::from_millis((3 - pos as u64) * 20)).await;
            TaskResult::ok(account.name, pos + 10)
        }
    })
    .await
    .expect("调度失败");

    // 结果仍然正确归属到各自的账号
    let units: Vec<(String, usize)> = summary.per_account_units().to_vec();
    assert!(units.contains(&("acc1".to_string(), 10)));
    assert!(units.contains(&("acc2".to_string(), 11)));
    assert!(units.contains(&("acc3".to_string(), 12)));
}

#[tokio::test]
async fn test_empty_selection_completes_without_batches() {
    let selection = selection_of(0);
    let channel = BufferChannel::new();
    let cancel = CancelToken::new();

    let summary = run_batches(&selection, 10, &cancel, &channel, 1, |_, account, _| {
        async move { TaskResult::ok(account.name, 1) }
    })
    .await
    .expect("调度失败");

    assert_eq!(summary.launched(), 0);
    assert_eq!(summary.batches_completed(), 0);
    assert!(!summary.cancelled());
}

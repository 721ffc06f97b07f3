//! 批次调度器 - 编排层
//!
//! ## 职责
//!
//! 把一次账号选择切成固定宽度的批次并依次驱动执行：
//!
//! 1. **分批**：按最大并发宽度切分，保持选择顺序，最后一批可以不满
//! 2. **并发控制**：批内所有账号任务并发执行（Semaphore 限宽）
//! 3. **汇合语义**：一批内全部任务结束后才开始下一批，单个失败不影响同批其他账号
//! 4. **取消检查**：每批开始前检查取消标记，已完成批次的统计保留
//! 5. **进度播报**：批次开始/完成通过操作员通道实时汇报
//!
//! 失败的账号不做任何自动重试，本次运行内即为终态。

use std::future::Future;
use std::ops::Range;
use std::sync::Arc;

use anyhow::Result;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::models::{AccountHandle, BatchSummary, OperatorId, RunSummary, SelectionSet, TaskResult};
use crate::orchestrator::cancel::CancelToken;
use crate::services::channel::OperatorChannel;

/// 按宽度切分 [0, total) 为连续区间
///
/// 区间数量为 ceil(total / width)，并集恰好覆盖原序列一次。
pub fn plan_batches(total: usize, width: usize) -> Vec<Range<usize>> {
    let width = width.max(1);
    let mut plan = Vec::new();
    let mut start = 0;
    while start < total {
        let end = (start + width).min(total);
        plan.push(start..end);
        start = end;
    }
    plan
}

/// 驱动一次选择的全部批次执行
///
/// `task(pos, account, cancel)` 由调用方提供：pos 是账号在选择内的位置，
/// 任务自身需要在安全点检查取消标记。返回累计的运行统计。
pub async fn run_batches<Ch, F, Fut>(
    selection: &SelectionSet,
    width: usize,
    cancel: &CancelToken,
    channel: &Ch,
    operator: OperatorId,
    task: F,
) -> Result<RunSummary>
where
    Ch: OperatorChannel,
    F: Fn(usize, AccountHandle, CancelToken) -> Fut,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    let width = width.max(1);
    let plan = plan_batches(selection.len(), width);
    let total_batches = plan.len();
    let semaphore = Arc::new(Semaphore::new(width));
    let mut summary = RunSummary::new();

    for (batch_idx, range) in plan.into_iter().enumerate() {
        // 批次开始前检查取消：不启动任何新批次
        if cancel.is_requested() {
            channel
                .send(operator, "❌ 已请求取消，不再启动后续批次。")
                .await?;
            break;
        }

        let batch_num = batch_idx + 1;
        info!(
            "📦 开始处理第 {}/{} 批（账号 {}-{}）",
            batch_num,
            total_batches,
            range.start + 1,
            range.end
        );
        channel
            .send(
                operator,
                &format!(
                    "开始处理第 {}/{} 批（账号 {} 到 {}）...",
                    batch_num,
                    total_batches,
                    range.start + 1,
                    range.end
                ),
            )
            .await?;

        // 批内任务全部并发启动
        let mut names = Vec::new();
        let mut handles = Vec::new();
        for pos in range {
            let account = selection.accounts[pos].clone();
            let permit = semaphore.clone().acquire_owned().await?;
            names.push(account.name.clone());

            let fut = task(pos, account, cancel.clone());
            handles.push(tokio::spawn(async move {
                let _permit = permit;
                fut.await
            }));
        }

        // 等待本批全部结束（汇合语义，不是最先完成者优先）
        let joined = join_all(handles).await;
        let mut batch = BatchSummary::new();
        for (name, joined_result) in names.into_iter().zip(joined) {
            match joined_result {
                Ok(result) => batch.record(result),
                Err(e) => {
                    error!("账号 {} 的任务执行中断: {}", name, e);
                    batch.record(TaskResult::failure(name, format!("任务执行中断: {}", e)));
                }
            }
        }

        info!(
            "✓ 第 {} 批完成: 成功 {}/{}",
            batch_num,
            batch.succeeded(),
            batch.succeeded() + batch.failed()
        );
        channel
            .send(
                operator,
                &format!(
                    "第 {} 批完成。成功 {}，失败 {}。\n明细: {}",
                    batch_num,
                    batch.succeeded(),
                    batch.failed(),
                    batch.details_line()
                ),
            )
            .await?;

        // 批次统计立即并入全局，之后取消也不会丢失
        summary.absorb(batch);

        if batch_num < total_batches && !cancel.is_requested() {
            channel.send(operator, "即将自动开始下一批...").await?;
        }
    }

    if cancel.is_requested() {
        summary.mark_cancelled();
    }
    Ok(summary)
}

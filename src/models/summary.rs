//! 任务结果与运行统计
//!
//! 每个被启动的账号任务恰好产生一条 `TaskResult`；
//! 批次统计在批次结束后立即并入全局统计，
//! 因此即使中途取消，已完成批次的进度也不会丢失。

use std::fmt;

/// 单个账号任务的最终结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskResult {
    /// 账号名称
    pub account: String,
    /// 是否成功
    pub success: bool,
    /// 详情（成功时为空，失败时为人类可读的错误描述）
    pub detail: String,
    /// 本次任务完成的工作单元数（例如创建的群数量，单步操作为 1）
    pub completed_units: usize,
}

impl TaskResult {
    /// 成功结果
    pub fn ok(account: impl Into<String>, completed_units: usize) -> Self {
        Self {
            account: account.into(),
            success: true,
            detail: String::new(),
            completed_units,
        }
    }

    /// 失败结果
    pub fn failure(account: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::failure_with_units(account, detail, 0)
    }

    /// 失败结果（带部分完成的工作单元数）
    pub fn failure_with_units(
        account: impl Into<String>,
        detail: impl Into<String>,
        completed_units: usize,
    ) -> Self {
        Self {
            account: account.into(),
            success: false,
            detail: detail.into(),
            completed_units,
        }
    }
}

/// 单批次统计
#[derive(Debug, Default)]
pub struct BatchSummary {
    results: Vec<TaskResult>,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一条任务结果
    pub fn record(&mut self, result: TaskResult) {
        self.results.push(result);
    }

    pub fn succeeded(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }

    pub fn total_units(&self) -> usize {
        self.results.iter().map(|r| r.completed_units).sum()
    }

    /// "账号: 单元数" 形式的明细行
    pub fn details_line(&self) -> String {
        if self.results.is_empty() {
            return "无".to_string();
        }
        self.results
            .iter()
            .map(|r| format!("{}: {}", r.account, r.completed_units))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn results(&self) -> &[TaskResult] {
        &self.results
    }
}

/// 整次运行的累计统计
///
/// 不变式：`launched == succeeded + failed`（被跳过的账号单独计数，
/// 不计入 launched）。取消时只包含已完成批次的结果。
#[derive(Debug, Default)]
pub struct RunSummary {
    launched: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    cancelled: bool,
    batches_completed: usize,
    failures: Vec<(String, String)>,
    per_account_units: Vec<(String, usize)>,
}

impl RunSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// 并入一个已完成批次的统计
    pub fn absorb(&mut self, batch: BatchSummary) {
        self.batches_completed += 1;
        for result in batch.results {
            self.launched += 1;
            if result.success {
                self.succeeded += 1;
            } else {
                self.failed += 1;
                self.failures
                    .push((result.account.clone(), result.detail.clone()));
            }
            self.per_account_units
                .push((result.account, result.completed_units));
        }
    }

    /// 标记本次运行被取消（幂等）
    pub fn mark_cancelled(&mut self) {
        self.cancelled = true;
    }

    /// 设置被跳过（从未启动任务）的账号数
    pub fn set_skipped(&mut self, skipped: usize) {
        self.skipped = skipped;
    }

    pub fn launched(&self) -> usize {
        self.launched
    }

    pub fn succeeded(&self) -> usize {
        self.succeeded
    }

    pub fn failed(&self) -> usize {
        self.failed
    }

    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn batches_completed(&self) -> usize {
        self.batches_completed
    }

    pub fn total_units(&self) -> usize {
        self.per_account_units.iter().map(|(_, n)| n).sum()
    }

    pub fn failures(&self) -> &[(String, String)] {
        &self.failures
    }

    pub fn per_account_units(&self) -> &[(String, usize)] {
        &self.per_account_units
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.cancelled {
            writeln!(f, "❌ 运行被取消，以下为已完成部分的统计。")?;
        } else {
            writeln!(f, "✅ 全部批次完成。")?;
        }
        writeln!(
            f,
            "完成时间: {}",
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
        )?;
        writeln!(f, "成功: {} | 失败: {} | 跳过: {}", self.succeeded, self.failed, self.skipped)?;
        if !self.per_account_units.is_empty() {
            let per_account = self
                .per_account_units
                .iter()
                .map(|(name, n)| format!("{}: {}", name, n))
                .collect::<Vec<_>>()
                .join("; ");
            writeln!(f, "各账号完成单元: {}", per_account)?;
        }
        if !self.failures.is_empty() {
            writeln!(f, "失败明细:")?;
            for (name, detail) in &self.failures {
                writeln!(f, "  {}: {}", name, detail)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_summary_counts() {
        let mut batch = BatchSummary::new();
        batch.record(TaskResult::ok("a", 3));
        batch.record(TaskResult::failure("b", "连接失败"));
        batch.record(TaskResult::ok("c", 1));

        assert_eq!(batch.succeeded(), 2);
        assert_eq!(batch.failed(), 1);
        assert_eq!(batch.total_units(), 4);
        assert_eq!(batch.details_line(), "a: 3, b: 0, c: 1");
    }

    #[test]
    fn test_run_summary_invariant() {
        // 已启动任务数 == 成功数 + 失败数，跳过的账号单独计数
        let mut summary = RunSummary::new();

        let mut batch1 = BatchSummary::new();
        batch1.record(TaskResult::ok("a", 1));
        batch1.record(TaskResult::failure("b", "出错"));
        summary.absorb(batch1);

        let mut batch2 = BatchSummary::new();
        batch2.record(TaskResult::ok("c", 2));
        summary.absorb(batch2);

        summary.set_skipped(1);

        assert_eq!(summary.launched(), 3);
        assert_eq!(summary.succeeded() + summary.failed(), summary.launched());
        assert_eq!(summary.skipped(), 1);
        assert_eq!(summary.batches_completed(), 2);
        assert_eq!(summary.total_units(), 3);
        assert_eq!(summary.failures().len(), 1);
        assert_eq!(summary.failures()[0].0, "b");
    }

    #[test]
    fn test_run_summary_invariant_holds_under_cancellation() {
        let mut summary = RunSummary::new();
        let mut batch = BatchSummary::new();
        batch.record(TaskResult::ok("a", 1));
        summary.absorb(batch);
        summary.mark_cancelled();
        summary.mark_cancelled();

        assert!(summary.cancelled());
        assert_eq!(summary.launched(), 1);
        assert_eq!(summary.succeeded() + summary.failed(), summary.launched());
    }

    #[test]
    fn test_display_mentions_failures() {
        let mut summary = RunSummary::new();
        let mut batch = BatchSummary::new();
        batch.record(TaskResult::failure("bad", "网络超时"));
        summary.absorb(batch);

        let rendered = summary.to_string();
        assert!(rendered.contains("bad"));
        assert!(rendered.contains("网络超时"));
    }
}

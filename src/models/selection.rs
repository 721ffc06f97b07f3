//! 账号选择解析
//!
//! 把操作员的自由文本解析为有序、去重的账号序号列表。
//! 支持三种形式：
//! - `all`：按注册表顺序选择全部账号
//! - `1,3,5`：逗号分隔的 1 基序号（无效或越界的会被丢弃，重复保留首次）
//! - `batch 1 20`：1 基闭区间，整体有效或整体拒绝
//!
//! 纯函数，无副作用。

use std::collections::HashSet;

use crate::error::SelectionError;
use crate::models::account::AccountHandle;

/// 解析 `all` 或逗号分隔序号，返回 0 基序号列表
///
/// 非数字与越界的 token 被静默丢弃；重复序号只保留第一次出现；
/// 结果顺序与输入顺序一致，而不是数值顺序。
pub fn parse_selection(text: &str, available: usize) -> Vec<usize> {
    let text = text.trim().to_lowercase();
    if text == "all" {
        return (0..available).collect();
    }

    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for part in text.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        if let Ok(n) = part.parse::<usize>() {
            if n >= 1 && n <= available {
                let idx = n - 1;
                if seen.insert(idx) {
                    out.push(idx);
                }
            }
        }
    }
    out
}

/// 解析 `batch <start> <end>` 形式（1 基闭区间）
///
/// 仅当 `1 <= start <= end <= available` 时返回连续升序区间，
/// 否则整体拒绝返回 `None`，不产生部分区间。
pub fn parse_batch_range(text: &str, available: usize) -> Option<Vec<usize>> {
    let text = text.trim().to_lowercase();
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() != 3 || parts[0] != "batch" {
        return None;
    }
    let start: usize = parts[1].parse().ok()?;
    let end: usize = parts[2].parse().ok()?;
    if start >= 1 && start <= end && end <= available {
        Some(((start - 1)..end).collect())
    } else {
        None
    }
}

/// 组合入口：batch 形式优先，其余走 all / 逗号形式
///
/// 空结果是可报告的独立情形，不会静默以零个账号继续。
pub fn resolve_selection(text: &str, available: usize) -> Result<Vec<usize>, SelectionError> {
    let trimmed = text.trim();
    if trimmed.to_lowercase().starts_with("batch") {
        return parse_batch_range(trimmed, available).ok_or_else(|| SelectionError::InvalidRange {
            input: trimmed.to_string(),
            available,
        });
    }

    let indices = parse_selection(trimmed, available);
    if indices.is_empty() {
        Err(SelectionError::NoValidIndices)
    } else {
        Ok(indices)
    }
}

/// 一次命令的目标账号集合
///
/// 序号指向命令开始时的注册表快照；账号列表按序号顺序展开。
#[derive(Debug, Clone)]
pub struct SelectionSet {
    /// 快照内的 0 基序号，无重复
    pub indices: Vec<usize>,
    /// 与序号一一对应的账号句柄
    pub accounts: Vec<AccountHandle>,
}

impl SelectionSet {
    /// 从序号列表与注册表快照构建
    pub fn from_indices(indices: Vec<usize>, snapshot: &[AccountHandle]) -> Self {
        let accounts = indices
            .iter()
            .filter_map(|&i| snapshot.get(i).cloned())
            .collect();
        Self { indices, accounts }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// 账号名称列表（选择顺序）
    pub fn names(&self) -> Vec<String> {
        self.accounts.iter().map(|a| a.name.clone()).collect()
    }
}

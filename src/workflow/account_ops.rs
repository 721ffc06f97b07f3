//! 单账号单步操作
//!
//! 把每种远程操作包装成"账号任务"：在任务边界捕获错误并转换为
//! `TaskResult`，一个账号失败不会影响同批次的其他账号。

use std::path::PathBuf;
use std::sync::Arc;

use tracing::error;

use crate::models::{AccountHandle, TaskResult};
use crate::services::client::AccountClient;
use crate::services::pacing::{pace, DIRECT_ACTION_DELAY};

/// 修改账号显示名称（第一个空格前为名，其后为姓）
pub async fn rename_account<C: AccountClient>(
    client: Arc<C>,
    account: AccountHandle,
    desired: String,
) -> TaskResult {
    let (first, last) = match desired.split_once(' ') {
        Some((first, rest)) => (first, Some(rest)),
        None => (desired.as_str(), None),
    };
    match client.update_profile_name(&account, first, last).await {
        Ok(()) => TaskResult::ok(account.name, 1),
        Err(e) => {
            error!("账号 {} 改名失败: {}", account.name, e);
            TaskResult::failure(account.name, e.to_string())
        }
    }
}

/// 设置账号头像
pub async fn apply_profile_photo<C: AccountClient>(
    client: Arc<C>,
    account: AccountHandle,
    photo_path: PathBuf,
) -> TaskResult {
    match client.set_profile_photo(&account, &photo_path).await {
        Ok(()) => TaskResult::ok(account.name, 1),
        Err(e) => {
            error!("账号 {} 设置头像失败: {}", account.name, e);
            TaskResult::failure(account.name, e.to_string())
        }
    }
}

/// 以账号身份向目标发送一条问候
pub async fn greet_target<C: AccountClient>(
    client: Arc<C>,
    account: AccountHandle,
    target: String,
) -> TaskResult {
    match client.send_direct_message(&account, &target, "hello").await {
        Ok(()) => {
            pace(DIRECT_ACTION_DELAY).await;
            TaskResult::ok(account.name, 1)
        }
        Err(e) => {
            error!("账号 {} 问候 {} 失败: {}", account.name, target, e);
            TaskResult::failure(account.name, e.to_string())
        }
    }
}

/// 以账号身份加入聊天
pub async fn join_chat_task<C: AccountClient>(
    client: Arc<C>,
    account: AccountHandle,
    link: String,
) -> TaskResult {
    match client.join_chat(&account, &link).await {
        Ok(()) => {
            pace(DIRECT_ACTION_DELAY).await;
            TaskResult::ok(account.name, 1)
        }
        Err(e) => {
            error!("账号 {} 加入 {} 失败: {}", account.name, link, e);
            TaskResult::failure(account.name, e.to_string())
        }
    }
}

/// 以账号身份退出聊天
pub async fn leave_chat_task<C: AccountClient>(
    client: Arc<C>,
    account: AccountHandle,
    link: String,
) -> TaskResult {
    match client.leave_chat(&account, &link).await {
        Ok(()) => {
            pace(DIRECT_ACTION_DELAY).await;
            TaskResult::ok(account.name, 1)
        }
        Err(e) => {
            error!("账号 {} 退出 {} 失败: {}", account.name, link, e);
            TaskResult::failure(account.name, e.to_string())
        }
    }
}

/// 两步验证修改的探测步骤
///
/// 程序化修改两步验证密码需要 SRP 密钥交换，这一步刻意不实现：
/// 只查询账号的密码状态并如实报告未执行。
pub async fn probe_two_step<C: AccountClient>(client: Arc<C>, account: AccountHandle) -> TaskResult {
    match client.has_cloud_password(&account).await {
        Ok(false) => TaskResult::failure(account.name, "账号未设置两步验证密码"),
        Ok(true) => TaskResult::failure(account.name, "密码修改未实现（需要 SRP 流程），未执行"),
        Err(e) => {
            error!("账号 {} 查询两步验证状态失败: {}", account.name, e);
            TaskResult::failure(account.name, format!("查询密码状态失败: {}", e))
        }
    }
}

//! 单账号批量建群流程
//!
//! 对一个账号执行"创建 N 个群"的完整流程：
//! 按计数区间命名、向新群发送问候语、动作间随机延迟。
//! 每创建一个群之前都检查取消标记，保证取消能在账号任务中途生效。
//! 单个群创建失败只消耗对应的计数槽位，不中断该账号的后续创建。

use std::sync::Arc;

use tracing::{debug, error, info};

use crate::config::DelayRange;
use crate::models::{AccountHandle, TaskResult};
use crate::orchestrator::CancelToken;
use crate::services::client::AccountClient;
use crate::services::pacing::pace;

/// 建群流程参数（一次运行内只读）
pub struct GroupCreationParams {
    /// 每个账号要创建的群数量
    pub per_account: usize,
    /// 群名称前缀
    pub base_name: String,
    /// 群名称计数区间 [start, end]
    pub counter: (u32, u32),
    /// 建群间隔
    pub group_delay: DelayRange,
    /// 群内消息间隔
    pub message_delay: DelayRange,
    /// 是否输出逐群日志
    pub verbose: bool,
}

/// 为一个账号创建一批群，返回该账号的任务结果
pub async fn create_groups_for_account<C: AccountClient>(
    client: Arc<C>,
    params: Arc<GroupCreationParams>,
    greetings: Arc<Vec<String>>,
    account: AccountHandle,
    cancel: CancelToken,
) -> TaskResult {
    let (start, end) = params.counter;
    let mut current = start;
    let mut created = 0usize;
    let mut last_error: Option<String> = None;

    for _ in 0..params.per_account {
        if cancel.is_requested() {
            info!("账号 {} 的建群任务被取消", account.name);
            break;
        }
        if current > end {
            break;
        }

        let title = format!("{} {}", params.base_name, current);
        match client.create_group(&account, &title).await {
            Ok(group_id) => {
                if params.verbose {
                    info!("账号 {} 创建群 '{}' 成功 (id={})", account.name, title, group_id);
                } else {
                    debug!("账号 {} 创建群 '{}' 成功 (id={})", account.name, title, group_id);
                }
                created += 1;
                send_greetings(&*client, &account, group_id, &greetings, params.message_delay)
                    .await;
                pace(params.group_delay).await;
            }
            Err(e) => {
                error!("账号 {} 创建群 '{}' 失败: {}", account.name, title, e);
                last_error = Some(e.to_string());
            }
        }
        current += 1;
    }

    // 一个群都没建成且确实出过错，才算账号级失败
    match (created, last_error) {
        (0, Some(err)) => TaskResult::failure(account.name, err),
        (n, _) => TaskResult::ok(account.name, n),
    }
}

/// 向新建的群依次发送问候语，消息之间随机延迟
///
/// 单条问候发送失败只记录日志，不影响后续问候与建群。
async fn send_greetings<C: AccountClient>(
    client: &C,
    account: &AccountHandle,
    group_id: i64,
    greetings: &[String],
    delay: DelayRange,
) {
    for text in greetings {
        if let Err(e) = client.send_group_message(account, group_id, text).await {
            error!("账号 {} 向群 {} 发送问候失败: {}", account.name, group_id, e);
            continue;
        }
        pace(delay).await;
    }
}

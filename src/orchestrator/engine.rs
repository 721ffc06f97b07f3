//! 多账号操作引擎 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责命令路由和长时间运行的执行：
//!
//! 1. **应用初始化**：加载操作配置、读取账号注册表
//! 2. **命令路由**：把操作员消息分发到对应会话的状态机
//! 3. **执行调度**：确认后的动作交给批次调度器，在后台任务中运行，
//!    操作员在执行期间仍可发送 /cancel
//! 4. **注册表维护**：/addsession、/removesession 及持久化
//! 5. **配置命令**：/config 查看与修改操作配置
//!
//! ## 设计特点
//!
//! - 每个操作员一个会话对象，生命周期与命令绑定（开始创建，结束复位）
//! - 状态机本身是同步逻辑，全部异步边界都收在引擎里
//! - 远程能力与消息通道都是注入的 trait，引擎不依赖具体协议

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::config::{Config, DelayRange, OpsConfig};
use crate::models::{AccountRegistry, OperatorId, RunSummary, SelectionSet};
use crate::orchestrator::batch_runner::run_batches;
use crate::orchestrator::cancel::CancelToken;
use crate::orchestrator::session::{CommandKind, OrchestrationSession, PendingAction, StepOutcome};
use crate::services::channel::OperatorChannel;
use crate::services::client::AccountClient;
use crate::storage;
use crate::workflow::account_ops;
use crate::workflow::group_creation::{create_groups_for_account, GroupCreationParams};

/// 控制台传输使用的操作员标识
pub const CONSOLE_OPERATOR: OperatorId = 0;

const HELP_TEXT: &str = "可用命令：\n\
/cgroups — 批量创建群组\n\
/changename — 批量修改显示名称\n\
/changedps — 批量修改头像\n\
/change2step — 两步验证密码修改（仅收集，不执行）\n\
/ping — 所有选中账号向目标发送问候\n\
/joinchat — 所有选中账号加入聊天\n\
/leavechat — 所有选中账号退出聊天\n\
/addsession <名称> <凭据串> — 添加账号\n\
/removesession — 删除账号\n\
/config — 查看或修改操作配置\n\
/cancel — 取消当前操作\n\
/stop — 退出";

/// 应用主结构
pub struct App<C, Ch> {
    config: Config,
    ops: Mutex<OpsConfig>,
    registry: Mutex<AccountRegistry>,
    sessions: Mutex<HashMap<OperatorId, OrchestrationSession>>,
    client: Arc<C>,
    channel: Arc<Ch>,
}

impl<C, Ch> App<C, Ch>
where
    C: AccountClient + 'static,
    Ch: OperatorChannel + 'static,
{
    /// 初始化应用：加载操作配置与账号注册表
    pub async fn initialize(config: Config, client: C, channel: Ch) -> Result<Arc<Self>> {
        info!("🚀 多账号操作引擎启动");
        info!("📊 每批并发账号数: {}", config.max_batch_width);

        let ops = storage::load_or_init_ops_config(&config.config_file).await?;
        let entries = storage::load_sessions(&config.sessions_file).await?;
        let registry = AccountRegistry::new(entries);

        Ok(Arc::new(Self {
            config,
            ops: Mutex::new(ops),
            registry: Mutex::new(registry),
            sessions: Mutex::new(HashMap::new()),
            client: Arc::new(client),
            channel: Arc::new(channel),
        }))
    }

    /// 处理一条操作员消息（命令或普通文本）
    pub async fn handle_text(self: &Arc<Self>, operator: OperatorId, text: &str) -> Result<()> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(());
        }

        if text.starts_with('/') {
            self.handle_command(operator, text).await
        } else {
            self.handle_reply(operator, text).await
        }
    }

    /// 消息通道（供嵌入方与测试读取）
    pub fn channel(&self) -> Arc<Ch> {
        Arc::clone(&self.channel)
    }

    /// 等待操作员当前运行中的命令结束（没有则立即返回）
    pub async fn wait_for_idle(&self, operator: OperatorId) {
        let handle = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .get_mut(&operator)
                .and_then(|s| s.take_run_handle())
        };
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// 控制台传输：按行读取标准输入作为操作员消息
    pub async fn run_console(self: &Arc<Self>) -> Result<()> {
        self.channel
            .send(
                CONSOLE_OPERATOR,
                "🚀 多账号操作引擎已就绪，输入 /help 查看命令。",
            )
            .await?;

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Some(line) = lines.next_line().await? {
            let text = line.trim();
            if text.is_empty() {
                continue;
            }
            if text == "/stop" {
                self.channel.send(CONSOLE_OPERATOR, "🛑 已停止。").await?;
                break;
            }
            if let Err(e) = self.handle_text(CONSOLE_OPERATOR, text).await {
                error!("处理消息失败: {}", e);
                let _ = self
                    .channel
                    .send(CONSOLE_OPERATOR, &format!("❌ 处理消息失败: {}", e))
                    .await;
            }
        }
        Ok(())
    }

    // ========== 命令路由 ==========

    async fn handle_command(self: &Arc<Self>, operator: OperatorId, text: &str) -> Result<()> {
        let mut parts = text.split_whitespace();
        let command = parts.next().unwrap_or_default().to_lowercase();
        let args: Vec<&str> = parts.collect();

        match command.as_str() {
            "/help" | "/start" => self.send(operator, HELP_TEXT).await,
            "/cancel" => {
                let outcome = {
                    let mut sessions = self.sessions.lock().await;
                    sessions.entry(operator).or_default().cancel_current()
                };
                self.deliver(operator, outcome).await
            }
            "/config" => self.config_command(operator, &args).await,
            "/addsession" => self.addsession_command(operator, &args).await,
            "/removesession" => {
                let snapshot = self.registry.lock().await.snapshot();
                let outcome = {
                    let mut sessions = self.sessions.lock().await;
                    sessions.entry(operator).or_default().start_removal(snapshot)
                };
                self.deliver(operator, outcome).await
            }
            "/cgroups" => self.start_command(operator, CommandKind::CreateGroups).await,
            "/changename" => self.start_command(operator, CommandKind::ChangeName).await,
            "/changedps" => self.start_command(operator, CommandKind::ChangeAvatar).await,
            "/change2step" => {
                self.start_command(operator, CommandKind::RotatePassword)
                    .await
            }
            "/ping" => self.start_command(operator, CommandKind::Ping).await,
            "/joinchat" => self.start_command(operator, CommandKind::JoinChat).await,
            "/leavechat" => self.start_command(operator, CommandKind::LeaveChat).await,
            _ => {
                self.send(operator, "未知命令，输入 /help 查看可用命令。")
                    .await
            }
        }
    }

    async fn start_command(self: &Arc<Self>, operator: OperatorId, kind: CommandKind) -> Result<()> {
        let snapshot = self.registry.lock().await.snapshot();
        let outcome = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(operator)
                .or_default()
                .start_command(kind, snapshot, self.config.max_batch_width)
        };
        self.deliver(operator, outcome).await
    }

    async fn handle_reply(self: &Arc<Self>, operator: OperatorId, text: &str) -> Result<()> {
        let ops = self.ops.lock().await.clone();
        let outcome = {
            let mut sessions = self.sessions.lock().await;
            sessions
                .entry(operator)
                .or_default()
                .on_message(text, &ops, self.config.max_batch_width)
        };
        self.deliver(operator, outcome).await
    }

    /// 发送回复并分发可能的待执行动作
    async fn deliver(self: &Arc<Self>, operator: OperatorId, outcome: StepOutcome) -> Result<()> {
        for reply in &outcome.replies {
            self.send(operator, reply).await?;
        }
        if let Some(action) = outcome.action {
            self.dispatch(operator, action).await?;
        }
        Ok(())
    }

    async fn send(&self, operator: OperatorId, text: &str) -> Result<()> {
        self.channel.send(operator, text).await?;
        Ok(())
    }

    // ========== 注册表与配置命令 ==========

    async fn addsession_command(
        self: &Arc<Self>,
        operator: OperatorId,
        args: &[&str],
    ) -> Result<()> {
        if args.len() < 2 {
            return self
                .send(operator, "用法: /addsession <名称> <凭据串>")
                .await;
        }
        let name = args[0].to_string();
        let session_string = args[1..].join(" ");

        let entries = {
            let mut registry = self.registry.lock().await;
            let replaced = registry.upsert(name.clone(), session_string);
            if replaced {
                info!("账号 {} 的凭据已更新", name);
            }
            registry.entries()
        };
        storage::save_sessions(&self.config.sessions_file, &entries).await?;
        self.send(operator, &format!("✅ 账号 {} 已保存。", name))
            .await
    }

    async fn config_command(self: &Arc<Self>, operator: OperatorId, args: &[&str]) -> Result<()> {
        if args.is_empty() {
            let ops = self.ops.lock().await.clone();
            let msg = format!(
                "⚙️ 当前配置:\n\
                 dg (建群间隔): {} 秒\n\
                 dm (消息间隔): {} 秒\n\
                 base (群名前缀): {}\n\
                 counter (计数区间): {} - {}\n\
                 修改方式:\n\
                 /config dg 10 15\n\
                 /config dm 5 8\n\
                 /config base NFT\n\
                 /config counter 1 45",
                ops.group_delay, ops.message_delay, ops.base_name, ops.counter.0, ops.counter.1
            );
            return self.send(operator, &msg).await;
        }

        let key = args[0].to_lowercase();
        let updated = match key.as_str() {
            "dg" | "dm" => match parse_delay_args(&args[1..]) {
                Some(range) => {
                    let mut ops = self.ops.lock().await;
                    if key == "dg" {
                        ops.group_delay = range;
                    } else {
                        ops.message_delay = range;
                    }
                    Some((ops.clone(), format!("✅ {} 已设置为 {} 秒。", key, range)))
                }
                None => {
                    return self
                        .send(operator, &format!("用法: /config {} <min> <max>", key))
                        .await;
                }
            },
            "base" => {
                if args.len() < 2 {
                    return self.send(operator, "用法: /config base <名称>").await;
                }
                let mut ops = self.ops.lock().await;
                ops.base_name = args[1..].join(" ");
                let msg = format!("✅ 群名前缀已设置为: {}", ops.base_name);
                Some((ops.clone(), msg))
            }
            "counter" => match parse_counter_args(&args[1..]) {
                Some((start, end)) => {
                    let mut ops = self.ops.lock().await;
                    ops.counter = (start, end);
                    Some((ops.clone(), format!("✅ 计数区间已设置为 {} - {}。", start, end)))
                }
                None => {
                    return self
                        .send(operator, "用法: /config counter <start> <end>（start <= end）")
                        .await;
                }
            },
            _ => {
                return self
                    .send(
                        operator,
                        "用法: /config [dg|dm|base|counter] [值...]\n输入 /config 查看当前配置。",
                    )
                    .await;
            }
        };

        if let Some((ops, msg)) = updated {
            storage::save_ops_config(&self.config.config_file, &ops).await?;
            self.send(operator, &msg).await?;
        }
        Ok(())
    }

    // ========== 动作执行 ==========

    async fn dispatch(self: &Arc<Self>, operator: OperatorId, action: PendingAction) -> Result<()> {
        // 注册表维护是同步小动作，直接执行
        let action = match action {
            PendingAction::RemoveSessions { names } => {
                let (removed, entries) = {
                    let mut registry = self.registry.lock().await;
                    let removed = registry.remove_many(&names);
                    (removed, registry.entries())
                };
                storage::save_sessions(&self.config.sessions_file, &entries).await?;
                return self
                    .send(
                        operator,
                        &format!(
                            "✅ 已删除账号: {}",
                            if removed.is_empty() {
                                "无".to_string()
                            } else {
                                removed.join(", ")
                            }
                        ),
                    )
                    .await;
            }
            other => other,
        };

        // 长时间运行的动作放到后台任务，操作员仍可 /cancel
        let cancel = CancelToken::new();
        {
            let mut sessions = self.sessions.lock().await;
            sessions.entry(operator).or_default().begin_run(cancel.clone());
        }

        let app = Arc::clone(self);
        let handle = tokio::spawn(async move {
            app.execute(operator, action, cancel).await;
        });

        let mut sessions = self.sessions.lock().await;
        sessions.entry(operator).or_default().set_run_handle(handle);
        Ok(())
    }

    async fn execute(self: Arc<Self>, operator: OperatorId, action: PendingAction, cancel: CancelToken) {
        if let Err(e) = self.execute_inner(operator, action, &cancel).await {
            error!("命令执行出错: {}", e);
            let _ = self
                .channel
                .send(operator, &format!("❌ 执行过程中发生错误: {}", e))
                .await;
        }

        let mut sessions = self.sessions.lock().await;
        if let Some(session) = sessions.get_mut(&operator) {
            session.finish_run();
        }
    }

    async fn execute_inner(
        &self,
        operator: OperatorId,
        action: PendingAction,
        cancel: &CancelToken,
    ) -> Result<()> {
        let width = self.config.max_batch_width;
        match action {
            PendingAction::CreateGroups {
                selection,
                per_account,
            } => {
                let ops = self.ops.lock().await.clone();
                let greetings = match storage::load_greetings(&self.config.greetings_file).await {
                    Ok(greetings) => greetings,
                    Err(e) => {
                        warn!("读取问候语失败，将不发送问候: {}", e);
                        Vec::new()
                    }
                };
                let params = Arc::new(GroupCreationParams {
                    per_account,
                    base_name: ops.base_name.clone(),
                    counter: ops.counter,
                    group_delay: ops.group_delay,
                    message_delay: ops.message_delay,
                    verbose: self.config.verbose_logging,
                });
                let greetings = Arc::new(greetings);
                let client = Arc::clone(&self.client);

                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |_pos, account, token| {
                        create_groups_for_account(
                            Arc::clone(&client),
                            Arc::clone(&params),
                            Arc::clone(&greetings),
                            account,
                            token,
                        )
                    },
                )
                .await?;
                self.report(operator, "建群", summary).await
            }
            PendingAction::ChangeNames { selection, names } => {
                let client = Arc::clone(&self.client);
                let names = Arc::new(names);
                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |pos, account, _token| {
                        let client = Arc::clone(&client);
                        let desired = names[pos].clone();
                        account_ops::rename_account(client, account, desired)
                    },
                )
                .await?;
                self.report(operator, "改名", summary).await
            }
            PendingAction::ChangeAvatars { selection, photos } => {
                let client = Arc::clone(&self.client);
                let photos = Arc::new(photos);
                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |pos, account, _token| {
                        let client = Arc::clone(&client);
                        let photo = photos[pos].clone();
                        account_ops::apply_profile_photo(client, account, photo)
                    },
                )
                .await?;
                self.report(operator, "换头像", summary).await
            }
            PendingAction::RotatePasswords { selection, records } => {
                // 被跳过的账号不启动任务
                let mut indices = Vec::new();
                let mut accounts = Vec::new();
                let mut skipped = 0usize;
                for (pos, record) in records.iter().enumerate() {
                    if record.skipped {
                        skipped += 1;
                    } else {
                        indices.push(selection.indices[pos]);
                        accounts.push(selection.accounts[pos].clone());
                    }
                }
                let active = SelectionSet { indices, accounts };

                let client = Arc::clone(&self.client);
                let mut summary = run_batches(
                    &active,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |_pos, account, _token| {
                        account_ops::probe_two_step(Arc::clone(&client), account)
                    },
                )
                .await?;
                summary.set_skipped(skipped);
                self.report(operator, "两步验证修改", summary).await?;
                self.send(
                    operator,
                    "提示：两步验证密码的实际修改需要 SRP 加密流程，本次运行未做任何修改。",
                )
                .await
            }
            PendingAction::Ping { selection, target } => {
                let client = Arc::clone(&self.client);
                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |_pos, account, _token| {
                        account_ops::greet_target(Arc::clone(&client), account, target.clone())
                    },
                )
                .await?;
                self.report(operator, "问候", summary).await
            }
            PendingAction::JoinChat { selection, link } => {
                let client = Arc::clone(&self.client);
                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |_pos, account, _token| {
                        account_ops::join_chat_task(Arc::clone(&client), account, link.clone())
                    },
                )
                .await?;
                self.report(operator, "加群", summary).await
            }
            PendingAction::LeaveChat { selection, link } => {
                let client = Arc::clone(&self.client);
                let summary = run_batches(
                    &selection,
                    width,
                    cancel,
                    self.channel.as_ref(),
                    operator,
                    move |_pos, account, _token| {
                        account_ops::leave_chat_task(Arc::clone(&client), account, link.clone())
                    },
                )
                .await?;
                self.report(operator, "退群", summary).await
            }
            PendingAction::RemoveSessions { .. } => Ok(()),
        }
    }

    async fn report(&self, operator: OperatorId, label: &str, summary: RunSummary) -> Result<()> {
        info!(
            "📊 {} 完成: 成功 {} 失败 {} 跳过 {} (批次 {})",
            label,
            summary.succeeded(),
            summary.failed(),
            summary.skipped(),
            summary.batches_completed()
        );
        self.send(operator, &format!("【{}】{}", label, summary))
            .await
    }
}

fn parse_delay_args(args: &[&str]) -> Option<DelayRange> {
    if args.len() != 2 {
        return None;
    }
    let min: u64 = args[0].parse().ok()?;
    let max: u64 = args[1].parse().ok()?;
    if min > max {
        return None;
    }
    Some(DelayRange(min, max))
}

fn parse_counter_args(args: &[&str]) -> Option<(u32, u32)> {
    if args.len() != 2 {
        return None;
    }
    let start: u32 = args[0].parse().ok()?;
    let end: u32 = args[1].parse().ok()?;
    if start == 0 || start > end {
        return None;
    }
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_delay_args() {
        assert_eq!(parse_delay_args(&["10", "15"]), Some(DelayRange(10, 15)));
        assert_eq!(parse_delay_args(&["15", "10"]), None);
        assert_eq!(parse_delay_args(&["x", "10"]), None);
        assert_eq!(parse_delay_args(&["10"]), None);
    }

    #[test]
    fn test_parse_counter_args() {
        assert_eq!(parse_counter_args(&["1", "45"]), Some((1, 45)));
        assert_eq!(parse_counter_args(&["0", "5"]), None);
        assert_eq!(parse_counter_args(&["9", "3"]), None);
    }
}

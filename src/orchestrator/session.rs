//! 操作员会话 - 编排层
//!
//! 每个操作员对应一个 `OrchestrationSession`，持有：
//! - 命令开始时的注册表快照
//! - 会话状态机当前状态（一个封闭枚举，而不是散落的动态键值）
//! - 运行中命令的取消标记与任务句柄
//!
//! 状态机本身是同步纯逻辑：输入一条操作员消息，输出若干回复和
//! 可选的待执行动作；异步执行由引擎负责。命令结束（完成、取消、
//! 放弃）后状态复位为 Idle。

use std::path::PathBuf;

use tokio::task::JoinHandle;

use crate::config::OpsConfig;
use crate::models::{format_account_list, AccountHandle, SelectionSet};
use crate::models::selection::resolve_selection;
use crate::orchestrator::cancel::CancelToken;
use crate::workflow::collector::{AccountRecord, CollectOutcome, SequentialCollector};
use crate::workflow::fields::two_step_fields;

/// 会话式命令种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    CreateGroups,
    ChangeName,
    ChangeAvatar,
    RotatePassword,
    Ping,
    JoinChat,
    LeaveChat,
}

impl CommandKind {
    pub fn label(&self) -> &'static str {
        match self {
            CommandKind::CreateGroups => "批量建群",
            CommandKind::ChangeName => "批量改名",
            CommandKind::ChangeAvatar => "批量换头像",
            CommandKind::RotatePassword => "两步验证修改",
            CommandKind::Ping => "批量问候",
            CommandKind::JoinChat => "批量加群",
            CommandKind::LeaveChat => "批量退群",
        }
    }
}

/// 确认后待执行的动作
pub enum PendingAction {
    CreateGroups {
        selection: SelectionSet,
        per_account: usize,
    },
    ChangeNames {
        selection: SelectionSet,
        names: Vec<String>,
    },
    ChangeAvatars {
        selection: SelectionSet,
        photos: Vec<PathBuf>,
    },
    RotatePasswords {
        selection: SelectionSet,
        records: Vec<AccountRecord>,
    },
    Ping {
        selection: SelectionSet,
        target: String,
    },
    JoinChat {
        selection: SelectionSet,
        link: String,
    },
    LeaveChat {
        selection: SelectionSet,
        link: String,
    },
    RemoveSessions {
        names: Vec<String>,
    },
}

/// 会话状态
enum CommandState {
    Idle,
    SelectingAccounts {
        kind: CommandKind,
    },
    AwaitGroupCount {
        selection: SelectionSet,
    },
    AwaitNameMode {
        selection: SelectionSet,
    },
    AwaitNameInput {
        selection: SelectionSet,
        per_line: bool,
    },
    AwaitAvatarMode {
        selection: SelectionSet,
    },
    CollectingAvatars {
        selection: SelectionSet,
        apply_all: bool,
        photos: Vec<PathBuf>,
    },
    AwaitAvatarConfirm {
        selection: SelectionSet,
        apply_all: bool,
        photos: Vec<PathBuf>,
    },
    AwaitTarget {
        kind: CommandKind,
        selection: SelectionSet,
    },
    CollectingFields {
        selection: SelectionSet,
        collector: SequentialCollector,
    },
    AwaitConfirm {
        pending: PendingAction,
    },
    AwaitRotationGo {
        pending: PendingAction,
    },
    SelectingRemoval,
    Running,
}

/// 一条消息处理后的产出
pub struct StepOutcome {
    pub replies: Vec<String>,
    pub action: Option<PendingAction>,
}

impl StepOutcome {
    fn reply(text: impl Into<String>) -> Self {
        Self {
            replies: vec![text.into()],
            action: None,
        }
    }

    fn replies(replies: Vec<String>) -> Self {
        Self {
            replies,
            action: None,
        }
    }

    fn action(replies: Vec<String>, action: PendingAction) -> Self {
        Self {
            replies,
            action: Some(action),
        }
    }
}

/// 操作员会话
pub struct OrchestrationSession {
    snapshot: Vec<AccountHandle>,
    state: CommandState,
    cancel: Option<CancelToken>,
    run_handle: Option<JoinHandle<()>>,
}

impl Default for OrchestrationSession {
    fn default() -> Self {
        Self::new()
    }
}

impl OrchestrationSession {
    pub fn new() -> Self {
        Self {
            snapshot: Vec::new(),
            state: CommandState::Idle,
            cancel: None,
            run_handle: None,
        }
    }

    /// 是否有命令正在执行
    pub fn is_running(&self) -> bool {
        matches!(self.state, CommandState::Running)
    }

    /// 开始一个会话式命令：取快照并进入账号选择
    pub fn start_command(
        &mut self,
        kind: CommandKind,
        snapshot: Vec<AccountHandle>,
        batch_width: usize,
    ) -> StepOutcome {
        if self.is_running() {
            return StepOutcome::reply("已有命令正在执行，请先 /cancel 或等待其完成。");
        }
        if snapshot.is_empty() {
            self.state = CommandState::Idle;
            return StepOutcome::reply("没有已配置的账号。请先用 /addsession 添加。");
        }

        let list = format_account_list(&snapshot);
        self.snapshot = snapshot;
        self.state = CommandState::SelectingAccounts { kind };
        StepOutcome::reply(format!(
            "{}：请选择账号\n{}\n回复方式：\n- all（全部，超过 {} 个将分批处理）\n- 1,3,5（逗号分隔序号）\n- batch 1 20（连续区间）\n随时可用 /cancel 取消。",
            kind.label(),
            list,
            batch_width
        ))
    }

    /// 开始删除账号流程
    pub fn start_removal(&mut self, snapshot: Vec<AccountHandle>) -> StepOutcome {
        if self.is_running() {
            return StepOutcome::reply("已有命令正在执行，请先 /cancel 或等待其完成。");
        }
        if snapshot.is_empty() {
            self.state = CommandState::Idle;
            return StepOutcome::reply("没有可删除的账号。");
        }
        let list = format_account_list(&snapshot);
        self.snapshot = snapshot;
        self.state = CommandState::SelectingRemoval;
        StepOutcome::reply(format!(
            "请选择要删除的账号（如 1 或 1,2,3）：\n{}",
            list
        ))
    }

    /// 处理一条非命令消息，按当前状态推进
    pub fn on_message(&mut self, text: &str, ops: &OpsConfig, batch_width: usize) -> StepOutcome {
        let state = std::mem::replace(&mut self.state, CommandState::Idle);
        match state {
            CommandState::Idle => {
                // 空闲状态下的普通文本不属于任何流程
                StepOutcome::replies(Vec::new())
            }
            CommandState::Running => {
                self.state = CommandState::Running;
                StepOutcome::reply("命令正在执行中，可用 /cancel 请求取消。")
            }
            CommandState::SelectingAccounts { kind } => {
                self.handle_selection(kind, text, batch_width)
            }
            CommandState::AwaitGroupCount { selection } => {
                self.handle_group_count(selection, text, ops)
            }
            CommandState::AwaitNameMode { selection } => self.handle_name_mode(selection, text),
            CommandState::AwaitNameInput {
                selection,
                per_line,
            } => self.handle_name_input(selection, per_line, text),
            CommandState::AwaitAvatarMode { selection } => {
                self.handle_avatar_mode(selection, text)
            }
            CommandState::CollectingAvatars {
                selection,
                apply_all,
                photos,
            } => self.handle_avatar_collect(selection, apply_all, photos, text),
            CommandState::AwaitAvatarConfirm {
                selection,
                apply_all,
                photos,
            } => self.handle_avatar_confirm(selection, apply_all, photos, text),
            CommandState::AwaitTarget { kind, selection } => {
                self.handle_target(kind, selection, text)
            }
            CommandState::CollectingFields {
                selection,
                collector,
            } => self.handle_collect_reply(selection, collector, text),
            CommandState::AwaitConfirm { pending } => self.handle_confirm(pending, text),
            CommandState::AwaitRotationGo { pending } => self.handle_rotation_go(pending, text),
            CommandState::SelectingRemoval => self.handle_removal_choice(text),
        }
    }

    /// 处理 /cancel：运行中则置取消标记，否则复位会话
    pub fn cancel_current(&mut self) -> StepOutcome {
        if let (CommandState::Running, Some(cancel)) = (&self.state, &self.cancel) {
            cancel.request();
            return StepOutcome::reply("❌ 正在取消，请等待当前批次结束...");
        }
        self.state = CommandState::Idle;
        StepOutcome::reply("已取消。")
    }

    /// 标记运行开始，保存取消标记
    pub fn begin_run(&mut self, cancel: CancelToken) {
        self.cancel = Some(cancel);
        self.state = CommandState::Running;
    }

    /// 保存运行任务的句柄
    pub fn set_run_handle(&mut self, handle: JoinHandle<()>) {
        self.run_handle = Some(handle);
    }

    /// 取出运行任务的句柄（等待空闲时使用）
    pub fn take_run_handle(&mut self) -> Option<JoinHandle<()>> {
        self.run_handle.take()
    }

    /// 运行结束：丢弃取消标记并复位状态
    pub fn finish_run(&mut self) {
        self.cancel = None;
        self.state = CommandState::Idle;
    }

    // ========== 各状态的处理函数 ==========

    fn handle_selection(&mut self, kind: CommandKind, text: &str, batch_width: usize) -> StepOutcome {
        let available = self.snapshot.len();
        let indices = match resolve_selection(text, available) {
            Ok(indices) => indices,
            Err(e) => {
                self.state = CommandState::SelectingAccounts { kind };
                return StepOutcome::reply(format!("{}，请重新输入或 /cancel。", e));
            }
        };

        let selection = SelectionSet::from_indices(indices, &self.snapshot);
        let mut replies = Vec::new();
        if text.trim().to_lowercase().starts_with("batch") {
            replies.push(format!(
                "已选择连续区间：第 {} 到第 {} 个账号（共 {} 个）。",
                selection.indices[0] + 1,
                selection.indices[selection.indices.len() - 1] + 1,
                selection.len()
            ));
        }
        if selection.len() > batch_width {
            replies.push(format!(
                "提示：已选择 {} 个账号，将按每批 {} 个处理。",
                selection.len(),
                batch_width
            ));
        }

        match kind {
            CommandKind::CreateGroups => {
                replies.push("每个账号要创建多少个群？".to_string());
                self.state = CommandState::AwaitGroupCount { selection };
            }
            CommandKind::ChangeName => {
                replies.push(
                    "按账号逐个提供名称，还是使用统一模板？回复 per 或 template".to_string(),
                );
                self.state = CommandState::AwaitNameMode { selection };
            }
            CommandKind::ChangeAvatar => {
                replies.push(
                    "选择模式：one_per（每个账号一张图片）或 apply_all（一张图片应用到全部）"
                        .to_string(),
                );
                self.state = CommandState::AwaitAvatarMode { selection };
            }
            CommandKind::RotatePassword => {
                let collector = SequentialCollector::new(two_step_fields(), selection.names());
                match collector.first_prompt() {
                    Some((account, prompt)) => {
                        replies.push(format!("账号 {}：{}", account, prompt));
                        self.state = CommandState::CollectingFields {
                            selection,
                            collector,
                        };
                    }
                    None => {
                        replies.push("没有需要收集的账号，已取消。".to_string());
                        self.state = CommandState::Idle;
                    }
                }
            }
            CommandKind::Ping => {
                replies.push("请输入要问候的目标用户名（如 @username）：".to_string());
                self.state = CommandState::AwaitTarget { kind, selection };
            }
            CommandKind::JoinChat | CommandKind::LeaveChat => {
                replies.push("请发送聊天链接或用户名（如 @chatname）：".to_string());
                self.state = CommandState::AwaitTarget { kind, selection };
            }
        }
        StepOutcome::replies(replies)
    }

    fn handle_group_count(
        &mut self,
        selection: SelectionSet,
        text: &str,
        ops: &OpsConfig,
    ) -> StepOutcome {
        let max_count = ops.counter_span();
        let count = match text.trim().parse::<usize>() {
            Ok(n) if n >= 1 && n <= max_count => n,
            _ => {
                self.state = CommandState::AwaitGroupCount { selection };
                return StepOutcome::reply(format!("请输入 1 到 {} 之间的数字。", max_count));
            }
        };

        // 建群无单独确认步骤，数量有效即开始执行
        StepOutcome::action(
            vec![format!(
                "收到：{} 个账号，每个创建 {} 个群。开始执行。",
                selection.len(),
                count
            )],
            PendingAction::CreateGroups {
                selection,
                per_account: count,
            },
        )
    }

    fn handle_name_mode(&mut self, selection: SelectionSet, text: &str) -> StepOutcome {
        match text.trim().to_lowercase().as_str() {
            "per" => {
                let count = selection.len();
                self.state = CommandState::AwaitNameInput {
                    selection,
                    per_line: true,
                };
                StepOutcome::reply(format!(
                    "请在一条消息里发送 {} 个名称，每行一个，顺序与账号列表一致。",
                    count
                ))
            }
            "template" => {
                self.state = CommandState::AwaitNameInput {
                    selection,
                    per_line: false,
                };
                StepOutcome::reply(
                    "请发送统一名称模板，可用占位符 {idx} 和 {session_name}。".to_string(),
                )
            }
            _ => {
                self.state = CommandState::AwaitNameMode { selection };
                StepOutcome::reply("请回复 per 或 template。")
            }
        }
    }

    fn handle_name_input(
        &mut self,
        selection: SelectionSet,
        per_line: bool,
        text: &str,
    ) -> StepOutcome {
        let names: Vec<String> = if per_line {
            let names: Vec<String> = text
                .lines()
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
            if names.len() != selection.len() {
                let expected = selection.len();
                let got = names.len();
                self.state = CommandState::AwaitNameInput {
                    selection,
                    per_line,
                };
                return StepOutcome::reply(format!(
                    "需要 {} 个名称，收到 {} 个。请重新发送（每行一个）。",
                    expected, got
                ));
            }
            names
        } else {
            let template = text.trim();
            selection
                .accounts
                .iter()
                .enumerate()
                .map(|(i, account)| {
                    template
                        .replace("{idx}", &(i + 1).to_string())
                        .replace("{session_name}", &account.name)
                })
                .collect()
        };

        let preview = selection
            .accounts
            .iter()
            .zip(&names)
            .map(|(account, name)| format!("{} -> {}", account.name, name))
            .collect::<Vec<_>>()
            .join("\n");
        self.state = CommandState::AwaitConfirm {
            pending: PendingAction::ChangeNames { selection, names },
        };
        StepOutcome::reply(format!(
            "将执行以下改名：\n{}\n回复 yes 执行，其他输入取消。",
            preview
        ))
    }

    fn handle_avatar_mode(&mut self, selection: SelectionSet, text: &str) -> StepOutcome {
        match text.trim().to_lowercase().as_str() {
            "one_per" => {
                let count = selection.len();
                self.state = CommandState::CollectingAvatars {
                    selection,
                    apply_all: false,
                    photos: Vec::new(),
                };
                StepOutcome::reply(format!(
                    "请逐条发送 {} 张图片的文件路径，发送完毕后回复 done。",
                    count
                ))
            }
            "apply_all" => {
                self.state = CommandState::CollectingAvatars {
                    selection,
                    apply_all: true,
                    photos: Vec::new(),
                };
                StepOutcome::reply(
                    "请发送一张图片的文件路径，它将应用到所有选中的账号。发送完毕后回复 done。",
                )
            }
            _ => {
                self.state = CommandState::AwaitAvatarMode { selection };
                StepOutcome::reply("请回复 one_per 或 apply_all。")
            }
        }
    }

    fn handle_avatar_collect(
        &mut self,
        selection: SelectionSet,
        apply_all: bool,
        mut photos: Vec<PathBuf>,
        text: &str,
    ) -> StepOutcome {
        let text = text.trim();
        if text.eq_ignore_ascii_case("done") {
            if photos.is_empty() {
                self.state = CommandState::Idle;
                return StepOutcome::reply("未收到任何图片，已取消。");
            }
            let count = photos.len();
            let total = selection.len();
            self.state = CommandState::AwaitAvatarConfirm {
                selection,
                apply_all,
                photos,
            };
            return StepOutcome::reply(format!(
                "已收到 {} 张图片。回复 yes 应用到 {} 个账号，其他输入取消。",
                count, total
            ));
        }

        photos.push(PathBuf::from(text));
        let received = photos.len();
        self.state = CommandState::CollectingAvatars {
            selection,
            apply_all,
            photos,
        };
        StepOutcome::reply(format!(
            "已收到第 {} 张图片，继续发送或回复 done。",
            received
        ))
    }

    fn handle_avatar_confirm(
        &mut self,
        selection: SelectionSet,
        apply_all: bool,
        photos: Vec<PathBuf>,
        text: &str,
    ) -> StepOutcome {
        let answer = text.trim().to_lowercase();
        if answer != "yes" && answer != "y" {
            self.state = CommandState::Idle;
            return StepOutcome::reply("已取消。");
        }

        let photos = if apply_all {
            vec![photos[0].clone(); selection.len()]
        } else if photos.len() != selection.len() {
            let expected = selection.len();
            let got = photos.len();
            self.state = CommandState::Idle;
            return StepOutcome::reply(format!(
                "需要 {} 张图片，收到 {} 张，已取消。",
                expected, got
            ));
        } else {
            photos
        };

        StepOutcome::action(
            vec!["收到，开始执行。".to_string()],
            PendingAction::ChangeAvatars { selection, photos },
        )
    }

    fn handle_target(
        &mut self,
        kind: CommandKind,
        selection: SelectionSet,
        text: &str,
    ) -> StepOutcome {
        let target = text.trim().to_string();
        if target.is_empty() {
            self.state = CommandState::AwaitTarget { kind, selection };
            return StepOutcome::reply("目标不能为空，请重新输入。");
        }

        let reply = format!("收到，开始对 {} 个账号执行{}。", selection.len(), kind.label());
        let action = match kind {
            CommandKind::Ping => PendingAction::Ping { selection, target },
            CommandKind::JoinChat => PendingAction::JoinChat {
                selection,
                link: target,
            },
            _ => PendingAction::LeaveChat {
                selection,
                link: target,
            },
        };
        StepOutcome::action(vec![reply], action)
    }

    fn handle_collect_reply(
        &mut self,
        selection: SelectionSet,
        mut collector: SequentialCollector,
        text: &str,
    ) -> StepOutcome {
        let outcome = collector.on_reply(text);
        match outcome {
            CollectOutcome::Prompt { account, prompt } => {
                self.state = CommandState::CollectingFields {
                    selection,
                    collector,
                };
                StepOutcome::reply(format!("账号 {}：{}", account, prompt))
            }
            CollectOutcome::Mismatch { account, prompt } => {
                self.state = CommandState::CollectingFields {
                    selection,
                    collector,
                };
                StepOutcome::replies(vec![
                    "两次输入的新密码不一致。".to_string(),
                    format!("账号 {}：{}", account, prompt),
                ])
            }
            CollectOutcome::Invalid { account, prompt } => {
                self.state = CommandState::CollectingFields {
                    selection,
                    collector,
                };
                StepOutcome::replies(vec![
                    "输入无效。".to_string(),
                    format!("账号 {}：{}", account, prompt),
                ])
            }
            CollectOutcome::Done => {
                let records = collector.into_records();
                self.state = CommandState::AwaitConfirm {
                    pending: PendingAction::RotatePasswords { selection, records },
                };
                StepOutcome::reply(
                    "所有账号收集完毕。回复 yes 继续，其他输入取消。",
                )
            }
        }
    }

    fn handle_confirm(&mut self, pending: PendingAction, text: &str) -> StepOutcome {
        let answer = text.trim().to_lowercase();
        if answer != "yes" && answer != "y" {
            self.state = CommandState::Idle;
            return StepOutcome::reply("已取消。");
        }

        if matches!(pending, PendingAction::RotatePasswords { .. }) {
            // 两步验证需要第二次显式确认
            self.state = CommandState::AwaitRotationGo { pending };
            return StepOutcome::reply(
                "注意：程序化修改两步验证密码需要额外的加密流程，且可能触发邮箱确认。\n回复 proceed-2step 继续，或回复 abort 放弃并丢弃已收集的密码。",
            );
        }
        StepOutcome::action(vec!["收到，开始执行。".to_string()], pending)
    }

    fn handle_rotation_go(&mut self, pending: PendingAction, text: &str) -> StepOutcome {
        match text.trim().to_lowercase().as_str() {
            "abort" => {
                self.state = CommandState::Idle;
                StepOutcome::reply("已放弃，收集的密码已丢弃。")
            }
            "proceed-2step" => {
                StepOutcome::action(vec!["收到，开始执行。".to_string()], pending)
            }
            _ => {
                self.state = CommandState::AwaitRotationGo { pending };
                StepOutcome::reply("未知指令。回复 proceed-2step 继续，或 abort 放弃。")
            }
        }
    }

    fn handle_removal_choice(&mut self, text: &str) -> StepOutcome {
        let indices = crate::models::selection::parse_selection(text, self.snapshot.len());
        if indices.is_empty() {
            self.state = CommandState::SelectingRemoval;
            return StepOutcome::reply("没有有效的账号序号，请重新输入或 /cancel。");
        }
        let names: Vec<String> = indices
            .iter()
            .filter_map(|&i| self.snapshot.get(i).map(|a| a.name.clone()))
            .collect();
        StepOutcome::action(Vec::new(), PendingAction::RemoveSessions { names })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(names: &[&str]) -> Vec<AccountHandle> {
        names
            .iter()
            .map(|n| AccountHandle::new(*n, "session"))
            .collect()
    }

    fn ops() -> OpsConfig {
        OpsConfig::default()
    }

    #[test]
    fn test_selection_error_reprompts() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::CreateGroups, snapshot(&["a", "b"]), 10);

        let outcome = session.on_message("xyz", &ops(), 10);
        assert!(outcome.action.is_none());
        assert!(outcome.replies[0].contains("没有有效的账号序号"));

        // 仍然停留在选择状态，可以重新输入
        let outcome = session.on_message("1,2", &ops(), 10);
        assert!(outcome.replies.iter().any(|r| r.contains("多少个群")));
    }

    #[test]
    fn test_group_count_validation() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::CreateGroups, snapshot(&["a"]), 10);
        session.on_message("all", &ops(), 10);

        let outcome = session.on_message("0", &ops(), 10);
        assert!(outcome.action.is_none());
        assert!(outcome.replies[0].contains("1 到 45"));

        let outcome = session.on_message("3", &ops(), 10);
        match outcome.action {
            Some(PendingAction::CreateGroups { per_account, .. }) => {
                assert_eq!(per_account, 3)
            }
            _ => panic!("应产生建群动作"),
        }
    }

    #[test]
    fn test_changename_template_flow() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::ChangeName, snapshot(&["alice", "bob"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("template", &ops(), 10);

        let outcome = session.on_message("NFT {idx} {session_name}", &ops(), 10);
        assert!(outcome.replies[0].contains("alice -> NFT 1 alice"));
        assert!(outcome.replies[0].contains("bob -> NFT 2 bob"));

        let outcome = session.on_message("yes", &ops(), 10);
        match outcome.action {
            Some(PendingAction::ChangeNames { names, .. }) => {
                assert_eq!(names, vec!["NFT 1 alice", "NFT 2 bob"]);
            }
            _ => panic!("应产生改名动作"),
        }
    }

    #[test]
    fn test_changename_per_line_count_mismatch() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::ChangeName, snapshot(&["a", "b"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("per", &ops(), 10);

        let outcome = session.on_message("只有一个名字", &ops(), 10);
        assert!(outcome.replies[0].contains("需要 2 个名称"));

        let outcome = session.on_message("名字一\n名字二", &ops(), 10);
        assert!(outcome.replies[0].contains("yes"));
    }

    #[test]
    fn test_confirm_rejection_cancels() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::ChangeName, snapshot(&["a"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("template", &ops(), 10);
        session.on_message("某某", &ops(), 10);

        let outcome = session.on_message("no", &ops(), 10);
        assert!(outcome.action.is_none());
        assert_eq!(outcome.replies[0], "已取消。");
    }

    #[test]
    fn test_rotation_needs_double_confirm() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::RotatePassword, snapshot(&["a"]), 10);
        session.on_message("all", &ops(), 10);

        // 收集：current -> new -> retype 一致
        session.on_message("cur", &ops(), 10);
        session.on_message("new-pw", &ops(), 10);
        let outcome = session.on_message("new-pw", &ops(), 10);
        assert!(outcome.replies[0].contains("收集完毕"));

        // 第一次确认后还需要 proceed-2step
        let outcome = session.on_message("yes", &ops(), 10);
        assert!(outcome.action.is_none());
        assert!(outcome.replies[0].contains("proceed-2step"));

        let outcome = session.on_message("proceed-2step", &ops(), 10);
        assert!(matches!(
            outcome.action,
            Some(PendingAction::RotatePasswords { .. })
        ));
    }

    #[test]
    fn test_rotation_abort_discards() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::RotatePassword, snapshot(&["a"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("skip", &ops(), 10);
        session.on_message("yes", &ops(), 10);

        let outcome = session.on_message("abort", &ops(), 10);
        assert!(outcome.action.is_none());
        assert!(outcome.replies[0].contains("丢弃"));
    }

    #[test]
    fn test_avatar_apply_all_duplicates_photo() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::ChangeAvatar, snapshot(&["a", "b", "c"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("apply_all", &ops(), 10);
        session.on_message("/tmp/photo.jpg", &ops(), 10);
        session.on_message("done", &ops(), 10);

        let outcome = session.on_message("yes", &ops(), 10);
        match outcome.action {
            Some(PendingAction::ChangeAvatars { photos, .. }) => {
                assert_eq!(photos.len(), 3);
                assert!(photos.iter().all(|p| p == &PathBuf::from("/tmp/photo.jpg")));
            }
            _ => panic!("应产生换头像动作"),
        }
    }

    #[test]
    fn test_avatar_one_per_count_mismatch_cancels() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::ChangeAvatar, snapshot(&["a", "b"]), 10);
        session.on_message("all", &ops(), 10);
        session.on_message("one_per", &ops(), 10);
        session.on_message("/tmp/1.jpg", &ops(), 10);
        session.on_message("done", &ops(), 10);

        let outcome = session.on_message("yes", &ops(), 10);
        assert!(outcome.action.is_none());
        assert!(outcome.replies[0].contains("已取消"));
    }

    #[test]
    fn test_busy_session_rejects_new_command() {
        let mut session = OrchestrationSession::new();
        session.begin_run(CancelToken::new());
        let outcome = session.start_command(CommandKind::Ping, snapshot(&["a"]), 10);
        assert!(outcome.replies[0].contains("正在执行"));
    }

    #[test]
    fn test_cancel_requests_token_when_running() {
        let mut session = OrchestrationSession::new();
        let token = CancelToken::new();
        session.begin_run(token.clone());

        let outcome = session.cancel_current();
        assert!(token.is_requested());
        assert!(outcome.replies[0].contains("正在取消"));
    }

    #[test]
    fn test_cancel_resets_idle_conversation() {
        let mut session = OrchestrationSession::new();
        session.start_command(CommandKind::Ping, snapshot(&["a"]), 10);
        session.cancel_current();

        // 取消后回到空闲，普通文本不再被解释
        let outcome = session.on_message("1", &ops(), 10);
        assert!(outcome.replies.is_empty());
        assert!(outcome.action.is_none());
    }

    #[test]
    fn test_removal_flow() {
        let mut session = OrchestrationSession::new();
        session.start_removal(snapshot(&["a", "b", "c"]));
        let outcome = session.on_message("2,3", &ops(), 10);
        match outcome.action {
            Some(PendingAction::RemoveSessions { names }) => {
                assert_eq!(names, vec!["b".to_string(), "c".to_string()]);
            }
            _ => panic!("应产生删除动作"),
        }
    }
}

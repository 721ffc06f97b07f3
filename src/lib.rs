//! # Multi Client Ops
//!
//! 一个通过会话式交互批量操作多个已登录账号的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用严格的分层架构：
//!
//! ### ① 存储层（Storage）
//! - `storage` - 会话凭据、操作配置、问候语的平面文件读写
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个账号
//! - `AccountClient` - 账号远程操作能力（注入的 trait）
//! - `OperatorChannel` - 操作员消息通道（注入的 trait）
//! - `pacing` - 动作间随机延迟
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个账号"的完整处理流程
//! - `SequentialCollector` - 逐账号顺序收集多段输入的状态机
//! - `group_creation` - 单账号批量建群流程
//! - `account_ops` - 改名 / 换头像 / 问候等单步任务
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/engine` - 命令路由与执行调度，管理操作员会话
//! - `orchestrator/session` - 会话式命令的状态机
//! - `orchestrator/batch_runner` - 批次分割、批内并发、取消检查
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, DelayRange, OpsConfig};
pub use error::{AppError, AppResult};
pub use models::{
    AccountHandle, AccountRegistry, OperatorId, RunSummary, SelectionSet, TaskResult,
};
pub use orchestrator::{App, CancelToken, CommandKind, OrchestrationSession, CONSOLE_OPERATOR};
pub use services::{AccountClient, BufferChannel, ConsoleChannel, DryRunClient, OperatorChannel};
pub use workflow::{CollectOutcome, SequentialCollector};

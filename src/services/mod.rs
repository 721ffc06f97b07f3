//! 业务能力层（Services）
//!
//! 描述"我能做什么"，不关心流程顺序：
//! - `client`：单个账号的远程操作能力（由外部协议实现方提供）
//! - `dry_run`:仅记录日志的演练实现，用于本地运行与测试
//! - `channel`：操作员消息通道
//! - `pacing`：动作之间的随机延迟

pub mod channel;
pub mod client;
pub mod dry_run;
pub mod pacing;

pub use channel::{BufferChannel, ConsoleChannel, OperatorChannel};
pub use client::AccountClient;
pub use dry_run::DryRunClient;
pub use pacing::{pace, DIRECT_ACTION_DELAY};

//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责命令路由、批次调度与取消控制，是整个系统的"指挥中心"。
//!
//! ### `engine` - 多账号操作引擎
//! - 管理应用生命周期（初始化、命令路由、执行调度）
//! - 维护每个操作员的会话对象
//! - 注册表与配置命令
//!
//! ### `session` - 操作员会话
//! - 会话式命令的状态机（选择 -> 收集 -> 确认 -> 执行）
//! - 持有命令快照与取消标记
//!
//! ### `batch_runner` - 批次调度器
//! - 按宽度分批、批内并发、批间顺序
//! - 取消检查与增量统计
//!
//! ### `cancel` - 协作式取消标记
//!
//! ## 层次关系
//!
//! ```text
//! engine (命令路由 / 执行调度)
//!     ↓
//! session (会话状态机)      batch_runner (批次调度)
//!     ↓                          ↓
//! workflow (单账号流程)  ←────────┘
//!     ↓
//! services (能力层：client / channel / pacing)
//! ```

pub mod batch_runner;
pub mod cancel;
pub mod engine;
pub mod session;

pub use batch_runner::{plan_batches, run_batches};
pub use cancel::CancelToken;
pub use engine::{App, CONSOLE_OPERATOR};
pub use session::{CommandKind, OrchestrationSession, PendingAction, StepOutcome};

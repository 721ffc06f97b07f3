//! 流程层（Workflow）
//!
//! 定义"一个账号"粒度的完整处理流程：
//!
//! ### `collector` - 逐账号顺序收集器
//! - 按固定字段表逐个账号收集多段输入
//! - 支持跳过、确认字段、不匹配重输
//!
//! ### `fields` - 各操作的字段表
//! - 用声明式表格描述字段顺序、校验与确认关系
//!
//! ### `group_creation` - 单账号批量建群流程
//! - 计数命名、群内问候、建群间隔、取消检查
//!
//! ### `account_ops` - 单账号单步操作
//! - 改名、换头像、问候、加退群、两步验证探测

pub mod account_ops;
pub mod collector;
pub mod fields;
pub mod group_creation;

pub use collector::{AccountRecord, CollectOutcome, FieldSpec, SequentialCollector};
pub use fields::{two_step_fields, SKIP_TOKEN};
pub use group_creation::{create_groups_for_account, GroupCreationParams};

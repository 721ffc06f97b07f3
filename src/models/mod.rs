pub mod account;
pub mod selection;
pub mod summary;

pub use account::{format_account_list, AccountHandle, AccountRegistry};
pub use selection::{parse_batch_range, parse_selection, resolve_selection, SelectionSet};
pub use summary::{BatchSummary, RunSummary, TaskResult};

/// 操作员标识（由外部消息通道分配）
pub type OperatorId = i64;

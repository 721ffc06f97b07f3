//! 协作式取消标记
//!
//! 一次运行一枚标记，由会话持有并克隆进每个并发任务。
//! 只会从 false 置为 true，运行期间从不复位，
//! 因此除原子可见性外不需要任何锁。

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// 取消标记
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求取消（一次性，不可撤销）
    pub fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// 是否已请求取消
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

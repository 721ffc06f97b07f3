//! 演练模式客户端
//!
//! 不连接任何远程服务，只记录日志并返回成功。
//! 用于在没有真实凭据的环境里验证编排流程，也是测试的默认客户端。

use std::path::Path;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tracing::info;

use crate::error::AppResult;
use crate::models::AccountHandle;
use crate::services::client::AccountClient;
use crate::utils::truncate_text;

/// 演练客户端
pub struct DryRunClient {
    next_group_id: AtomicI64,
}

impl DryRunClient {
    pub fn new() -> Self {
        Self {
            next_group_id: AtomicI64::new(1),
        }
    }
}

impl Default for DryRunClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AccountClient for DryRunClient {
    async fn create_group(&self, account: &AccountHandle, title: &str) -> AppResult<i64> {
        let id = self.next_group_id.fetch_add(1, Ordering::SeqCst);
        info!("[演练] {} 创建群 '{}' (id={})", account.name, title, id);
        Ok(id)
    }

    async fn send_group_message(
        &self,
        account: &AccountHandle,
        group_id: i64,
        text: &str,
    ) -> AppResult<()> {
        info!(
            "[演练] {} 向群 {} 发送消息（{} 字符）",
            account.name,
            group_id,
            text.chars().count()
        );
        Ok(())
    }

    async fn send_direct_message(
        &self,
        account: &AccountHandle,
        target: &str,
        text: &str,
    ) -> AppResult<()> {
        info!("[演练] {} -> {}: {}", account.name, target, truncate_text(text, 40));
        Ok(())
    }

    async fn update_profile_name(
        &self,
        account: &AccountHandle,
        first_name: &str,
        last_name: Option<&str>,
    ) -> AppResult<()> {
        info!(
            "[演练] {} 改名为 {} {}",
            account.name,
            first_name,
            last_name.unwrap_or("")
        );
        Ok(())
    }

    async fn set_profile_photo(
        &self,
        account: &AccountHandle,
        photo_path: &Path,
    ) -> AppResult<()> {
        info!("[演练] {} 设置头像: {}", account.name, photo_path.display());
        Ok(())
    }

    async fn join_chat(&self, account: &AccountHandle, link: &str) -> AppResult<()> {
        info!("[演练] {} 加入 {}", account.name, link);
        Ok(())
    }

    async fn leave_chat(&self, account: &AccountHandle, link: &str) -> AppResult<()> {
        info!("[演练] {} 退出 {}", account.name, link);
        Ok(())
    }

    async fn has_cloud_password(&self, account: &AccountHandle) -> AppResult<bool> {
        info!("[演练] 查询 {} 的两步验证状态", account.name);
        Ok(true)
    }
}

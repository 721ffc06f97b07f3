//! 账号远程操作能力
//!
//! 编排层只依赖这个 trait，不关心远程协议细节。
//! 真正的协议实现由集成方提供；本仓库自带 `DryRunClient` 用于演练。

use std::path::Path;

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::AccountHandle;

/// 单个账号的远程操作集合
///
/// 所有方法都以单个账号为粒度，失败通过 `AppResult` 返回，
/// 由调用方在任务边界转换为 `TaskResult`。
#[async_trait]
pub trait AccountClient: Send + Sync {
    /// 以该账号身份创建一个群，返回群 ID
    async fn create_group(&self, account: &AccountHandle, title: &str) -> AppResult<i64>;

    /// 向指定群发送一条消息
    async fn send_group_message(
        &self,
        account: &AccountHandle,
        group_id: i64,
        text: &str,
    ) -> AppResult<()>;

    /// 向指定目标（用户名）发送一条私聊消息
    async fn send_direct_message(
        &self,
        account: &AccountHandle,
        target: &str,
        text: &str,
    ) -> AppResult<()>;

    /// 修改账号的显示名称
    async fn update_profile_name(
        &self,
        account: &AccountHandle,
        first_name: &str,
        last_name: Option<&str>,
    ) -> AppResult<()>;

    /// 设置账号头像
    async fn set_profile_photo(&self, account: &AccountHandle, photo_path: &Path)
        -> AppResult<()>;

    /// 通过链接或用户名加入聊天
    async fn join_chat(&self, account: &AccountHandle, link: &str) -> AppResult<()>;

    /// 通过链接或用户名退出聊天
    async fn leave_chat(&self, account: &AccountHandle, link: &str) -> AppResult<()>;

    /// 查询账号是否已设置两步验证密码
    async fn has_cloud_password(&self, account: &AccountHandle) -> AppResult<bool>;
}

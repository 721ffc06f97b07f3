//! 操作员消息通道
//!
//! 核心只需要"把一段文字发给操作员"这一个能力，
//! 由外层会话式传输（控制台、IM 机器人等）提供实现。

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::OperatorId;

/// 向操作员发送文字的通道
#[async_trait]
pub trait OperatorChannel: Send + Sync {
    async fn send(&self, operator: OperatorId, text: &str) -> AppResult<()>;
}

/// 控制台通道：直接打印到标准输出
pub struct ConsoleChannel;

#[async_trait]
impl OperatorChannel for ConsoleChannel {
    async fn send(&self, _operator: OperatorId, text: &str) -> AppResult<()> {
        println!("{}", text);
        Ok(())
    }
}

/// 缓冲通道：把消息累积在内存里
///
/// 供测试断言和嵌入式集成使用。
#[derive(Default)]
pub struct BufferChannel {
    messages: std::sync::Mutex<Vec<(OperatorId, String)>>,
}

impl BufferChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取走并清空已累积的消息
    pub fn drain(&self) -> Vec<(OperatorId, String)> {
        match self.messages.lock() {
            Ok(mut guard) => guard.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }

    /// 当前累积消息的副本
    pub fn snapshot(&self) -> Vec<(OperatorId, String)> {
        match self.messages.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => Vec::new(),
        }
    }
}

#[async_trait]
impl OperatorChannel for BufferChannel {
    async fn send(&self, operator: OperatorId, text: &str) -> AppResult<()> {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((operator, text.to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_buffer_channel_accumulates() {
        let channel = BufferChannel::new();
        channel.send(1, "你好").await.expect("发送失败");
        channel.send(1, "世界").await.expect("发送失败");

        let messages = channel.drain();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].1, "你好");
        assert!(channel.snapshot().is_empty());
    }
}

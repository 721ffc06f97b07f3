use serde::{Deserialize, Serialize};
use std::fmt;

/// 延迟区间（秒），随机取值范围为 [min, max]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayRange(pub u64, pub u64);

impl DelayRange {
    /// 区间下界
    pub fn min_secs(&self) -> u64 {
        self.0
    }

    /// 区间上界
    pub fn max_secs(&self) -> u64 {
        self.1
    }
}

impl fmt::Display for DelayRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.0, self.1)
    }
}

/// 操作配置（持久化在 config.toml 中，可通过 /config 命令修改）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpsConfig {
    /// 建群间隔（秒）
    #[serde(rename = "dg")]
    pub group_delay: DelayRange,
    /// 群内消息间隔（秒）
    #[serde(rename = "dm")]
    pub message_delay: DelayRange,
    /// 群名称前缀
    #[serde(rename = "base")]
    pub base_name: String,
    /// 群名称计数区间 [start, end]
    pub counter: (u32, u32),
}

impl Default for OpsConfig {
    fn default() -> Self {
        Self {
            group_delay: DelayRange(12, 15),
            message_delay: DelayRange(7, 10),
            base_name: "NFT".to_string(),
            counter: (1, 45),
        }
    }
}

impl OpsConfig {
    /// 计数区间能容纳的最大群数量
    pub fn counter_span(&self) -> usize {
        let (start, end) = self.counter;
        if end < start {
            0
        } else {
            (end - start + 1) as usize
        }
    }
}

/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    /// 每批同时处理的账号数量
    pub max_batch_width: usize,
    /// 会话凭据文件
    pub sessions_file: String,
    /// 操作配置文件
    pub config_file: String,
    /// 问候语文件
    pub greetings_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_batch_width: 10,
            sessions_file: "sessions.json".to_string(),
            config_file: "config.toml".to_string(),
            greetings_file: "greetings.txt".to_string(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            max_batch_width: std::env::var("MAX_BATCH_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_batch_width),
            sessions_file: std::env::var("SESSIONS_FILE").unwrap_or(default.sessions_file),
            config_file: std::env::var("CONFIG_FILE").unwrap_or(default.config_file),
            greetings_file: std::env::var("GREETINGS_FILE").unwrap_or(default.greetings_file),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_span() {
        let ops = OpsConfig::default();
        assert_eq!(ops.counter_span(), 45);

        let ops = OpsConfig {
            counter: (10, 12),
            ..OpsConfig::default()
        };
        assert_eq!(ops.counter_span(), 3);

        // 起点大于终点视为空区间
        let ops = OpsConfig {
            counter: (5, 3),
            ..OpsConfig::default()
        };
        assert_eq!(ops.counter_span(), 0);
    }

    #[test]
    fn test_ops_config_toml_roundtrip() {
        let ops = OpsConfig::default();
        let text = toml::to_string(&ops).expect("序列化失败");
        assert!(text.contains("dg"));
        assert!(text.contains("base"));

        let parsed: OpsConfig = toml::from_str(&text).expect("解析失败");
        assert_eq!(parsed, ops);
    }
}

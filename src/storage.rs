//! 平面文件存储
//!
//! 负责三类文件的读写：
//! - `sessions.json`：账号名称 -> 会话凭据串 的映射（保持文件内顺序）
//! - `config.toml`：可由操作员修改的操作配置
//! - `greetings.txt`：`"""..."""` 包裹的问候语块
//!
//! 写入一律先写临时文件再原子替换，避免中断导致凭据文件损坏。

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tokio::fs;
use tracing::info;

use crate::config::OpsConfig;
use crate::error::{AppError, AppResult};

/// 读取会话凭据文件，返回按文件顺序排列的 (名称, 凭据) 列表
///
/// 文件不存在时返回空列表。
pub async fn load_sessions(path: &str) -> AppResult<Vec<(String, String)>> {
    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::read_failed(path, e))?;
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(&content)?;

    let mut entries = Vec::new();
    for (name, value) in map {
        if let Some(session) = value.as_str() {
            entries.push((name, session.to_string()));
        }
    }
    info!("已加载 {} 个会话凭据", entries.len());
    Ok(entries)
}

/// 原子写入会话凭据文件
pub async fn save_sessions(path: &str, entries: &[(String, String)]) -> AppResult<()> {
    let mut map = serde_json::Map::new();
    for (name, session) in entries {
        map.insert(name.clone(), serde_json::Value::String(session.clone()));
    }
    let content = serde_json::to_string_pretty(&serde_json::Value::Object(map))?;
    write_atomic(path, &content).await
}

/// 读取操作配置文件；不存在时写入默认配置并返回它
pub async fn load_or_init_ops_config(path: &str) -> AppResult<OpsConfig> {
    if !Path::new(path).exists() {
        let ops = OpsConfig::default();
        save_ops_config(path, &ops).await?;
        info!("配置文件不存在，已写入默认配置: {}", path);
        return Ok(ops);
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::read_failed(path, e))?;
    let ops: OpsConfig = toml::from_str(&content)?;
    Ok(ops)
}

/// 原子写入操作配置文件
pub async fn save_ops_config(path: &str, ops: &OpsConfig) -> AppResult<()> {
    let content = toml::to_string(ops).map_err(|e| AppError::write_failed(path, e))?;
    write_atomic(path, &content).await
}

/// 读取问候语文件；不存在时返回空列表
pub async fn load_greetings(path: &str) -> AppResult<Vec<String>> {
    if !Path::new(path).exists() {
        return Ok(Vec::new());
    }
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::read_failed(path, e))?;
    Ok(extract_greetings(&content))
}

/// 从文本内容中提取 `"""..."""` 包裹的问候语块
pub fn extract_greetings(content: &str) -> Vec<String> {
    static GREETING_RE: OnceLock<Regex> = OnceLock::new();
    let re = GREETING_RE
        .get_or_init(|| Regex::new(r#"(?s)"{3}(.*?)"{3}"#).expect("问候语正则表达式无效"));

    re.captures_iter(content)
        .filter_map(|cap| cap.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// 先写临时文件，再重命名覆盖目标文件
async fn write_atomic(path: &str, content: &str) -> AppResult<()> {
    let tmp_path = format!("{}.tmp", path);
    fs::write(&tmp_path, content)
        .await
        .map_err(|e| AppError::write_failed(&tmp_path, e))?;
    fs::rename(&tmp_path, path)
        .await
        .map_err(|e| AppError::write_failed(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_greetings() {
        let content = r#"
"""
早上好，朋友们！
"""

一些无关文字

"""多行
问候"""

""""""
"#;
        let greetings = extract_greetings(content);
        assert_eq!(greetings.len(), 2);
        assert_eq!(greetings[0], "早上好，朋友们！");
        assert_eq!(greetings[1], "多行\n问候");
    }

    #[test]
    fn test_extract_greetings_empty_input() {
        assert!(extract_greetings("").is_empty());
        assert!(extract_greetings("没有任何问候块").is_empty());
    }

    #[tokio::test]
    async fn test_sessions_roundtrip() {
        let path = std::env::temp_dir().join(format!("mco_sessions_{}.json", std::process::id()));
        let path_str = path.to_string_lossy().to_string();

        let entries = vec![
            ("zulu".to_string(), "session-1".to_string()),
            ("alpha".to_string(), "session-2".to_string()),
        ];
        save_sessions(&path_str, &entries).await.expect("写入失败");

        // 文件内顺序必须保持，不能按名称重新排序
        let loaded = load_sessions(&path_str).await.expect("读取失败");
        assert_eq!(loaded, entries);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn test_missing_files_yield_defaults() {
        let missing = "/nonexistent/mco_missing.json";
        assert!(load_sessions(missing).await.expect("应返回空列表").is_empty());
        assert!(load_greetings(missing).await.expect("应返回空列表").is_empty());
    }
}

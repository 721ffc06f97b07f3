//! 账号模型
//!
//! 封装"一个外部已登录账号"的身份与凭据引用

/// 账号句柄
///
/// 包含账号名称与不透明的会话凭据串。命令开始时从注册表快照得到，
/// 运行期间只读。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountHandle {
    /// 账号名称（注册表内唯一）
    pub name: String,
    /// 会话凭据串（内容对编排层不透明）
    pub session_string: String,
}

impl AccountHandle {
    pub fn new(name: impl Into<String>, session_string: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            session_string: session_string.into(),
        }
    }
}

/// 账号注册表
///
/// 持有全部已配置账号，顺序与凭据文件中的顺序一致。
/// 命令开始时通过 `snapshot()` 取快照，运行过程中不再感知注册表变化。
#[derive(Debug, Default)]
pub struct AccountRegistry {
    accounts: Vec<AccountHandle>,
}

impl AccountRegistry {
    pub fn new(entries: Vec<(String, String)>) -> Self {
        Self {
            accounts: entries
                .into_iter()
                .map(|(name, session)| AccountHandle::new(name, session))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// 取当前注册表的有序快照
    pub fn snapshot(&self) -> Vec<AccountHandle> {
        self.accounts.clone()
    }

    /// 新增或替换一个账号，返回是否替换了已有账号
    pub fn upsert(&mut self, name: impl Into<String>, session_string: impl Into<String>) -> bool {
        let name = name.into();
        let session_string = session_string.into();
        if let Some(existing) = self.accounts.iter_mut().find(|a| a.name == name) {
            existing.session_string = session_string;
            true
        } else {
            self.accounts.push(AccountHandle::new(name, session_string));
            false
        }
    }

    /// 删除多个账号，返回实际删除的名称
    pub fn remove_many(&mut self, names: &[String]) -> Vec<String> {
        let mut removed = Vec::new();
        for name in names {
            if let Some(pos) = self.accounts.iter().position(|a| &a.name == name) {
                self.accounts.remove(pos);
                removed.push(name.clone());
            }
        }
        removed
    }

    /// 导出为 (名称, 凭据) 列表，用于持久化
    pub fn entries(&self) -> Vec<(String, String)> {
        self.accounts
            .iter()
            .map(|a| (a.name.clone(), a.session_string.clone()))
            .collect()
    }
}

/// 按 "1. 名称" 格式列出账号，供操作员选择
pub fn format_account_list(accounts: &[AccountHandle]) -> String {
    accounts
        .iter()
        .enumerate()
        .map(|(i, a)| format!("{}. {}", i + 1, a.name))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_order_preserved() {
        let registry = AccountRegistry::new(vec![
            ("bravo".to_string(), "s1".to_string()),
            ("alpha".to_string(), "s2".to_string()),
        ]);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot[0].name, "bravo");
        assert_eq!(snapshot[1].name, "alpha");
    }

    #[test]
    fn test_upsert_replaces_existing() {
        let mut registry = AccountRegistry::new(vec![("a".to_string(), "old".to_string())]);
        assert!(registry.upsert("a", "new"));
        assert!(!registry.upsert("b", "s"));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.snapshot()[0].session_string, "new");
    }

    #[test]
    fn test_remove_many() {
        let mut registry = AccountRegistry::new(vec![
            ("a".to_string(), "1".to_string()),
            ("b".to_string(), "2".to_string()),
            ("c".to_string(), "3".to_string()),
        ]);
        let removed = registry.remove_many(&["b".to_string(), "x".to_string()]);
        assert_eq!(removed, vec!["b".to_string()]);
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_format_account_list() {
        let accounts = vec![
            AccountHandle::new("one", "s"),
            AccountHandle::new("two", "s"),
        ];
        assert_eq!(format_account_list(&accounts), "1. one\n2. two");
    }
}

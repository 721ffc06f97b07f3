//! 逐账号顺序收集器
//!
//! 一个通用的有限状态机：按选择顺序逐个账号收集 K 段有序输入，
//! 全部收集完成后才允许任何远程动作执行。
//!
//! 规则：
//! - 在某账号第一个字段处回复跳过标记，则整个账号记为跳过
//! - 确认字段与被确认字段不一致时，回退到被确认字段重新输入（光标不前移）
//! - 无法识别的输入不前移也不接受，重新提示当前字段
//!
//! 本组件严格单线程：同一时刻只有一个待回复的提示，
//! 下一条操作员消息总是相对当前 (账号, 字段) 解释。

use crate::workflow::fields::SKIP_TOKEN;

/// 一个输入字段的声明
pub struct FieldSpec {
    /// 字段键（写入收集记录时使用）
    pub key: &'static str,
    /// 提示语
    pub prompt: &'static str,
    /// 若为 Some(i)，表示本字段是第 i 个字段的确认字段
    pub confirms: Option<usize>,
    /// 可选的输入校验
    pub validate: Option<fn(&str) -> bool>,
}

/// 单个账号的收集记录
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountRecord {
    /// 账号名称
    pub account: String,
    /// 是否被操作员跳过
    pub skipped: bool,
    /// 与字段表一一对应的已收集值
    pub values: Vec<Option<String>>,
}

impl AccountRecord {
    fn new(account: String, field_count: usize) -> Self {
        Self {
            account,
            skipped: false,
            values: vec![None; field_count],
        }
    }

    /// 按字段键取值
    pub fn value(&self, fields: &[FieldSpec], key: &str) -> Option<&str> {
        let idx = fields.iter().position(|f| f.key == key)?;
        self.values.get(idx)?.as_deref()
    }
}

/// 一次回复处理后的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// 继续：向操作员发出下一个提示
    Prompt { account: String, prompt: &'static str },
    /// 确认字段不匹配：回退并重新提示被确认字段
    Mismatch { account: String, prompt: &'static str },
    /// 输入无效：重新提示当前字段
    Invalid { account: String, prompt: &'static str },
    /// 所有账号收集完毕
    Done,
}

/// 顺序收集器状态机
pub struct SequentialCollector {
    fields: &'static [FieldSpec],
    accounts: Vec<String>,
    cursor: usize,
    sub_step: usize,
    records: Vec<AccountRecord>,
    done: bool,
}

impl SequentialCollector {
    pub fn new(fields: &'static [FieldSpec], accounts: Vec<String>) -> Self {
        let records = accounts
            .iter()
            .map(|name| AccountRecord::new(name.clone(), fields.len()))
            .collect();
        let done = accounts.is_empty();
        Self {
            fields,
            accounts,
            cursor: 0,
            sub_step: 0,
            records,
            done,
        }
    }

    /// 第一个提示（账号名称, 提示语）
    pub fn first_prompt(&self) -> Option<(String, &'static str)> {
        if self.done {
            return None;
        }
        Some((self.accounts[0].clone(), self.fields[0].prompt))
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// 当前等待输入的账号名称
    pub fn current_account(&self) -> Option<&str> {
        if self.done {
            None
        } else {
            Some(&self.accounts[self.cursor])
        }
    }

    /// 处理一条操作员回复，推进状态机
    pub fn on_reply(&mut self, text: &str) -> CollectOutcome {
        if self.done {
            return CollectOutcome::Done;
        }

        let text = text.trim();
        let account = self.accounts[self.cursor].clone();
        let spec = &self.fields[self.sub_step];

        // 第一个字段处允许跳过整个账号
        if self.sub_step == 0 && text.eq_ignore_ascii_case(SKIP_TOKEN) {
            self.records[self.cursor].skipped = true;
            return self.advance_account();
        }

        // 空输入与校验失败都重新提示当前字段
        if text.is_empty() {
            return CollectOutcome::Invalid {
                account,
                prompt: spec.prompt,
            };
        }
        if let Some(validate) = spec.validate {
            if !validate(text) {
                return CollectOutcome::Invalid {
                    account,
                    prompt: spec.prompt,
                };
            }
        }

        // 确认字段：与被确认字段不一致时回退重输
        if let Some(confirmed_idx) = spec.confirms {
            let expected = self.records[self.cursor].values[confirmed_idx].clone();
            if expected.as_deref() != Some(text) {
                self.sub_step = confirmed_idx;
                return CollectOutcome::Mismatch {
                    account,
                    prompt: self.fields[confirmed_idx].prompt,
                };
            }
        }

        self.records[self.cursor].values[self.sub_step] = Some(text.to_string());
        self.sub_step += 1;
        if self.sub_step == self.fields.len() {
            self.advance_account()
        } else {
            CollectOutcome::Prompt {
                account,
                prompt: self.fields[self.sub_step].prompt,
            }
        }
    }

    /// 取出全部收集记录（按选择顺序）
    pub fn into_records(self) -> Vec<AccountRecord> {
        self.records
    }

    fn advance_account(&mut self) -> CollectOutcome {
        self.cursor += 1;
        self.sub_step = 0;
        if self.cursor == self.accounts.len() {
            self.done = true;
            CollectOutcome::Done
        } else {
            CollectOutcome::Prompt {
                account: self.accounts[self.cursor].clone(),
                prompt: self.fields[0].prompt,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::fields::two_step_fields;

    fn collector_for(names: &[&str]) -> SequentialCollector {
        SequentialCollector::new(
            two_step_fields(),
            names.iter().map(|s| s.to_string()).collect(),
        )
    }

    #[test]
    fn test_skip_advances_to_next_account() {
        let mut collector = collector_for(&["one", "two"]);
        let outcome = collector.on_reply("skip");
        match outcome {
            CollectOutcome::Prompt { account, .. } => assert_eq!(account, "two"),
            other => panic!("意外结果: {:?}", other),
        }
        assert_eq!(collector.current_account(), Some("two"));
    }

    #[test]
    fn test_skip_only_valid_on_first_field() {
        let mut collector = collector_for(&["one"]);
        collector.on_reply("current-pw");
        // 第二个字段处的 skip 是普通输入
        collector.on_reply("skip");
        collector.on_reply("skip");
        assert!(collector.is_done());
        let records = collector.into_records();
        assert!(!records[0].skipped);
        assert_eq!(records[0].values[1].as_deref(), Some("skip"));
    }

    #[test]
    fn test_full_walkthrough_with_mismatch() {
        let mut collector = collector_for(&["a", "b", "c"]);

        // 账号 a：跳过
        match collector.on_reply("skip") {
            CollectOutcome::Prompt { account, .. } => assert_eq!(account, "b"),
            other => panic!("意外结果: {:?}", other),
        }

        // 账号 b：current -> new -> retype 不匹配 -> 回退到 new
        collector.on_reply("a");
        collector.on_reply("b");
        match collector.on_reply("c") {
            CollectOutcome::Mismatch { account, .. } => assert_eq!(account, "b"),
            other => panic!("应回退重输: {:?}", other),
        }
        // 光标没有前移
        assert_eq!(collector.current_account(), Some("b"));

        // 重新输入并确认一致 -> 前进到账号 c
        collector.on_reply("b2");
        match collector.on_reply("b2") {
            CollectOutcome::Prompt { account, .. } => assert_eq!(account, "c"),
            other => panic!("意外结果: {:?}", other),
        }

        // 账号 c 完成 -> Done
        collector.on_reply("x");
        collector.on_reply("y");
        assert_eq!(collector.on_reply("y"), CollectOutcome::Done);
        assert!(collector.is_done());

        let records = collector.into_records();
        assert!(records[0].skipped);
        assert_eq!(records[1].value(two_step_fields(), "new"), Some("b2"));
        assert_eq!(records[2].value(two_step_fields(), "current"), Some("x"));
    }

    #[test]
    fn test_invalid_input_reprompts_same_field() {
        let mut collector = collector_for(&["one"]);
        let outcome = collector.on_reply("   ");
        match outcome {
            CollectOutcome::Invalid { account, .. } => assert_eq!(account, "one"),
            other => panic!("空输入应重新提示: {:?}", other),
        }
        // 状态没有变化
        assert_eq!(collector.current_account(), Some("one"));
    }

    #[test]
    fn test_empty_account_list_is_done() {
        let collector = SequentialCollector::new(two_step_fields(), Vec::new());
        assert!(collector.is_done());
        assert!(collector.first_prompt().is_none());
    }
}

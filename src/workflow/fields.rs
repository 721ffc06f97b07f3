//! 各操作的字段表
//!
//! 用声明式表格描述一个操作需要逐账号收集哪些字段、
//! 校验规则以及确认关系，收集器引擎据此通用运转。

use crate::workflow::collector::FieldSpec;

/// 跳过当前账号的标记（在账号的第一个字段处回复）
pub const SKIP_TOKEN: &str = "skip";

static TWO_STEP_FIELDS: [FieldSpec; 3] = [
    FieldSpec {
        key: "current",
        prompt: "请回复当前两步验证密码（或回复 skip 跳过该账号）",
        confirms: None,
        validate: Some(non_empty),
    },
    FieldSpec {
        key: "new",
        prompt: "请回复新密码",
        confirms: None,
        validate: Some(non_empty),
    },
    FieldSpec {
        key: "retype",
        prompt: "请再次输入新密码",
        confirms: Some(1),
        validate: None,
    },
];

/// 两步验证密码修改的字段表：当前密码 -> 新密码 -> 重复新密码
pub fn two_step_fields() -> &'static [FieldSpec] {
    &TWO_STEP_FIELDS
}

fn non_empty(text: &str) -> bool {
    !text.trim().is_empty()
}

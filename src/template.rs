//! 模板变量替换
//!
//! 宿主工单系统的模板引擎在这里只是一个纯函数：`render(template, vars) -> text`。
//! 占位符格式为 `%{name}`，name 允许字母、数字、`_` 和 `.`（如 `%{ticket.number}`）。

use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"%\{([A-Za-z0-9_.]+)\}").expect("placeholder regex is valid"))
}

/// 替换模板中的 `%{name}` 占位符
///
/// 未知变量保持原样；替换结果不会被再次扫描。
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    placeholder_re()
        .replace_all(template, |caps: &regex::Captures| {
            let name = &caps[1];
            match vars.get(name) {
                Some(value) => value.clone(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

//! Slack 文本格式化
//!
//! Slack 会把 `<...>` 当作链接/提及语法解析，`&` 用于实体。工单内容里的这些字符
//! 必须转义，只有组装器自己插入的链接语法才允许保留。
//!
//! 做法：组装器用一对保留标记包裹链接，`format_text` 先整体转义，再把标记还原为
//! `<` / `>`。来自工单的文本在插值前先经过 `strip_markers`，所以任意工单内容都
//! 不可能伪造出链接语法。

/// 链接开始标记（Unicode 私用区字符）
pub const LINK_OPEN: char = '\u{E000}';

/// 链接结束标记
pub const LINK_CLOSE: char = '\u{E001}';

/// 格式化后文本的最大字符数
pub const MAX_TEXT_CHARS: usize = 500;

/// 转义 Slack 控制字符，还原组装器的链接标记，并截断到 500 个字符
pub fn format_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            LINK_OPEN => out.push('<'),
            LINK_CLOSE => out.push('>'),
            c => out.push(c),
        }
    }
    truncate_chars(&out, MAX_TEXT_CHARS)
}

/// 移除文本中的保留标记（用于所有来自工单的内容）
pub fn strip_markers(text: &str) -> String {
    text.chars()
        .filter(|c| *c != LINK_OPEN && *c != LINK_CLOSE)
        .collect()
}

/// 生成带标记的链接：格式化后变为 `<url|label>`
pub fn link(url: &str, label: &str) -> String {
    format!(
        "{}{}|{}{}",
        LINK_OPEN,
        strip_markers(url),
        strip_markers(label),
        LINK_CLOSE
    )
}

/// 按字符（而不是字节）截断
pub fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

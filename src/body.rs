//! 线程正文转纯文本
//!
//! 宿主的消息正文默认是清洗过的 HTML，发送到 Slack 前先渲染为纯文本，
//! 之后再做 Slack 转义。纯文本正文只去掉首尾空白。

use serde::{Deserialize, Serialize};

/// 渲染宽度：足够大，正文不会被折行
const RENDER_WIDTH: usize = 10_000;

/// 正文格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyFormat {
    #[default]
    Html,
    Text,
}

/// 把正文转成纯文本
pub fn to_plain_text(body: &str, format: BodyFormat) -> String {
    match format {
        BodyFormat::Text => body.trim().to_string(),
        BodyFormat::Html => html2text::from_read(body.as_bytes(), RENDER_WIDTH)
            .trim()
            .to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_tags_removed() {
        let text = to_plain_text("<p>It jams</p><p>Again</p>", BodyFormat::Html);
        assert!(text.contains("It jams"));
        assert!(text.contains("Again"));
        assert!(!text.contains('<'));
    }

    #[test]
    fn test_html_entities_decoded() {
        let text = to_plain_text("<p>a &lt; b &amp;&amp; c</p>", BodyFormat::Html);
        assert_eq!(text, "a < b && c");
    }

    #[test]
    fn test_plain_text_untouched() {
        let text = to_plain_text("  line one\n<not a tag>  ", BodyFormat::Text);
        assert_eq!(text, "line one\n<not a tag>");
    }

    #[test]
    fn test_format_parsing() {
        let html: BodyFormat = serde_json::from_str(r#""html""#).unwrap();
        let text: BodyFormat = serde_json::from_str(r#""text""#).unwrap();
        assert_eq!(html, BodyFormat::Html);
        assert_eq!(text, BodyFormat::Text);
        assert_eq!(BodyFormat::default(), BodyFormat::Html);
    }
}

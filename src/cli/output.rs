//! CLI 输出格式化

use serde::Serialize;

/// 格式化为缩进 JSON；序列化失败时输出空对象
pub fn format_json<T: Serialize>(data: &T) -> String {
    serde_json::to_string_pretty(data).unwrap_or_else(|_| "{}".to_string())
}

/// 格式化 unix 时间戳和距今秒数，用于 `cache show`
pub fn format_timestamp(ts: i64, now: i64) -> String {
    match chrono::DateTime::from_timestamp(ts, 0) {
        Some(dt) => format!("{} ({}s ago)", dt.format("%Y-%m-%d %H:%M:%S UTC"), now - ts),
        None => format!("{} (invalid)", ts),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_json_pretty() {
        let out = format_json(&serde_json::json!({"outcome": "sent"}));
        assert_eq!(out, "{\n  \"outcome\": \"sent\"\n}");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(
            format_timestamp(1_700_000_000, 1_700_000_030),
            "2023-11-14 22:13:20 UTC (30s ago)"
        );
    }
}

//! 工单只读视图
//!
//! 工单和线程对象属于宿主系统，这里只定义通知流水线需要的访问器。
//! `TicketSnapshot` 是 hook 通过 stdin 传入的 JSON 快照，实现了同一个 trait。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::body::BodyFormat;
use crate::template;

/// 通知流水线读取工单所需的访问器
pub trait TicketView {
    /// 内部 ID（用于链接和去重键）
    fn id(&self) -> u64;
    /// 对外展示的工单号
    fn number(&self) -> &str;
    fn subject(&self) -> &str;
    /// 负责人显示名
    fn owner(&self) -> &str;
    fn dept_id(&self) -> Option<u32>;
    /// 当前状态名（分类时读取，而不是从编辑描述中读取）
    fn status_name(&self) -> Option<&str>;
    fn is_overdue(&self) -> bool;
    fn open_task_count(&self) -> u32;
    /// 第一条消息的线程条目 ID
    fn first_message_id(&self) -> Option<u64>;
    /// 第一条消息原文，格式见 `first_message_format`
    fn first_message_body(&self) -> &str;
    fn first_message_format(&self) -> BodyFormat;
    /// 用宿主模板引擎渲染模板，`extra` 为额外变量
    fn replace_vars(&self, template: &str, extra: &HashMap<String, String>) -> String;
}

/// 工单快照（hook 输入）
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TicketSnapshot {
    pub id: u64,
    pub number: String,
    pub subject: String,
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub dept_id: Option<u32>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub overdue: bool,
    #[serde(default)]
    pub open_tasks: u32,
    /// 第一条消息
    #[serde(default)]
    pub first_message: Option<FirstMessage>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FirstMessage {
    pub id: u64,
    /// 原文；默认是宿主清洗过的 HTML
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub format: BodyFormat,
}

impl TicketSnapshot {
    /// 模板中可用的工单变量
    fn template_vars(&self) -> HashMap<String, String> {
        let mut vars = HashMap::new();
        vars.insert("ticket.id".to_string(), self.id.to_string());
        vars.insert("ticket.number".to_string(), self.number.clone());
        vars.insert("ticket.subject".to_string(), self.subject.clone());
        vars.insert("ticket.owner".to_string(), self.owner.clone());
        vars.insert(
            "ticket.status".to_string(),
            self.status.clone().unwrap_or_default(),
        );
        vars.insert(
            "ticket.dept_id".to_string(),
            self.dept_id.map(|d| d.to_string()).unwrap_or_default(),
        );
        vars
    }
}

impl TicketView for TicketSnapshot {
    fn id(&self) -> u64 {
        self.id
    }

    fn number(&self) -> &str {
        &self.number
    }

    fn subject(&self) -> &str {
        &self.subject
    }

    fn owner(&self) -> &str {
        &self.owner
    }

    fn dept_id(&self) -> Option<u32> {
        self.dept_id
    }

    fn status_name(&self) -> Option<&str> {
        self.status.as_deref()
    }

    fn is_overdue(&self) -> bool {
        self.overdue
    }

    fn open_task_count(&self) -> u32 {
        self.open_tasks
    }

    fn first_message_id(&self) -> Option<u64> {
        self.first_message.as_ref().map(|m| m.id)
    }

    fn first_message_body(&self) -> &str {
        self.first_message
            .as_ref()
            .map(|m| m.body.as_str())
            .unwrap_or("")
    }

    fn first_message_format(&self) -> BodyFormat {
        self.first_message
            .as_ref()
            .map(|m| m.format)
            .unwrap_or_default()
    }

    fn replace_vars(&self, template: &str, extra: &HashMap<String, String>) -> String {
        let mut vars = self.template_vars();
        // 额外变量优先
        vars.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        template::render(template, &vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_deserialize_minimal() {
        let json = r#"{"id": 42, "number": "100042", "subject": "Printer issue"}"#;
        let ticket: TicketSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.id(), 42);
        assert_eq!(ticket.status_name(), None);
        assert_eq!(ticket.first_message_id(), None);
        assert_eq!(ticket.first_message_body(), "");
        assert_eq!(ticket.first_message_format(), BodyFormat::Html);
        assert!(!ticket.is_overdue());
    }

    #[test]
    fn test_first_message_format_from_json() {
        let json = r#"{"id": 1, "number": "1", "subject": "s",
                       "first_message": {"id": 9, "body": "hi", "format": "text"}}"#;
        let ticket: TicketSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(ticket.first_message_format(), BodyFormat::Text);
    }

    #[test]
    fn test_replace_vars_extra_overrides_ticket_vars() {
        let ticket = TicketSnapshot {
            id: 7,
            number: "100007".to_string(),
            subject: "VPN down".to_string(),
            ..Default::default()
        };
        let mut extra = HashMap::new();
        extra.insert("slack_safe_message".to_string(), "body".to_string());
        extra.insert("ticket.subject".to_string(), "override".to_string());

        let template = "%{ticket.number} %{ticket.subject}: %{slack_safe_message}";
        let out = ticket.replace_vars(template, &extra);
        assert_eq!(out, "100007 override: body");
    }
}

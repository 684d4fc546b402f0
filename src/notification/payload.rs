//! Payload 构建模块 - 把通知意图组装成 Slack 附件
//!
//! Payload 格式：
//! ```json
//! {
//!   "attachments": [{
//!     "pretext": "New Ticket <https://help.example.com/scp/tickets.php?id=42|#100042> created",
//!     "fallback": "...",
//!     "color": "good",
//!     "title": "Printer issue",
//!     "title_link": "https://help.example.com/scp/tickets.php?id=42",
//!     "author": "Ada",
//!     "text": "It jams",
//!     "footer": "via ticket-slack-notify",
//!     "ts": 1760000000,
//!     "mrkdwn_in": ["text"]
//!   }]
//! }
//! ```
//!
//! 组装是纯函数：时间由调用方传入。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::formatter::{format_text, strip_markers};
use super::intent::{MessageShape, NotificationIntent, COLOR_OVERDUE};
use crate::config::HostContext;
use crate::ticket::TicketView;

/// 附件页脚
pub const FOOTER: &str = "via ticket-slack-notify";

/// 页脚图标
pub const FOOTER_ICON: &str = "https://platform.slack-edge.com/img/default_application_icon.png";

/// 模板中放入转义后正文的变量名
pub const SAFE_MESSAGE_VAR: &str = "slack_safe_message";

/// Webhook 请求体
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub attachments: Vec<Attachment>,
}

impl WebhookPayload {
    /// 唯一的附件
    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachments.first()
    }
}

/// Slack 附件
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pretext: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_icon: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<AttachmentField>,
}

/// 附件字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachmentField {
    pub title: String,
    pub value: String,
    pub short: bool,
}

/// 消息组装器
pub struct MessageComposer<'a> {
    host: &'a HostContext,
    template: &'a str,
}

impl<'a> MessageComposer<'a> {
    pub fn new(host: &'a HostContext, template: &'a str) -> Self {
        Self { host, template }
    }

    /// 组装 payload
    pub fn compose<T: TicketView>(
        &self,
        ticket: &T,
        intent: &NotificationIntent,
        now: DateTime<Utc>,
    ) -> WebhookPayload {
        let mut attachment = match intent.shape {
            MessageShape::Full => self.full(ticket, intent),
            MessageShape::Compact => self.compact(ticket, intent),
        };

        attachment.title_link = Some(self.host.ticket_url(ticket.id()));
        attachment.footer = Some(FOOTER.to_string());
        attachment.footer_icon = Some(FOOTER_ICON.to_string());
        attachment.ts = Some(now.timestamp());

        // 逾期工单统一使用强调色
        let color = if ticket.is_overdue() {
            COLOR_OVERDUE
        } else {
            intent.color
        };
        attachment.color = Some(color.to_string());

        WebhookPayload {
            attachments: vec![attachment],
        }
    }

    fn full<T: TicketView>(&self, ticket: &T, intent: &NotificationIntent) -> Attachment {
        let heading = format_text(&intent.heading);

        let mut extra = HashMap::new();
        extra.insert(
            SAFE_MESSAGE_VAR.to_string(),
            format_text(&strip_markers(&intent.body)),
        );
        let text = ticket.replace_vars(self.template, &extra);

        let mut fields = Vec::new();
        let open_tasks = ticket.open_task_count();
        if open_tasks > 0 {
            fields.push(AttachmentField {
                title: "Open Tasks".to_string(),
                value: open_tasks.to_string(),
                short: true,
            });
        }

        let owner = ticket.owner().trim();

        Attachment {
            pretext: Some(heading.clone()),
            fallback: Some(heading),
            author: (!owner.is_empty()).then(|| format_text(&strip_markers(owner))),
            title: Some(format_text(&strip_markers(ticket.subject()))),
            text: Some(text),
            mrkdwn_in: vec!["text".to_string()],
            fields,
            ..Default::default()
        }
    }

    fn compact<T: TicketView>(&self, ticket: &T, intent: &NotificationIntent) -> Attachment {
        let status = strip_markers(intent.status_name.as_deref().unwrap_or_default());
        let title = strip_markers(&format!("#{}: {}", ticket.number(), ticket.subject()));

        Attachment {
            fallback: Some(format_text(&format!("{} - Status: {}", title, status))),
            title: Some(format_text(&title)),
            text: Some(format_text(&format!("Status: {}", status))),
            ..Default::default()
        }
    }
}

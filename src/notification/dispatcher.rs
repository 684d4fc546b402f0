//! 通知管道 - 分类、选址、过滤、组装、发送
//!
//! 每次 hook 调用同步执行一遍管道，结果以 `NotifyOutcome` 返回，
//! 任何失败都不会向宿主传播。

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use serde_json::json;
use std::fmt;
use tracing::{debug, error, info, warn};

use super::classifier::{Classification, EventClassifier, SuppressReason};
use super::event::{HookEnvelope, TicketEvent};
use super::payload::MessageComposer;
use super::store::{DedupCache, FileDedupStore};
use super::webhook::{redact_endpoint, DryRunSender, HttpWebhookSender, WebhookSender};
use crate::config::{HostContext, NotifierConfig};
use crate::ticket::TicketView;

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 分类器抑制
    Suppressed(SuppressReason),
    /// 没有可用的 webhook 地址
    NoEndpoint,
    /// 主题命中忽略规则
    SubjectIgnored,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Suppressed(reason) => write!(f, "{}", reason),
            SkipReason::NoEndpoint => write!(f, "no_endpoint"),
            SkipReason::SubjectIgnored => write!(f, "subject_ignored"),
        }
    }
}

/// 管道结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    Sent,
    Skipped(SkipReason),
    Failed(String),
}

impl NotifyOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotifyOutcome::Sent)
    }

    /// CLI `--json` 输出
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            NotifyOutcome::Sent => json!({ "outcome": "sent" }),
            NotifyOutcome::Skipped(reason) => {
                json!({ "outcome": "skipped", "reason": reason.to_string() })
            }
            NotifyOutcome::Failed(error) => json!({ "outcome": "failed", "error": error }),
        }
    }
}

impl fmt::Display for NotifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NotifyOutcome::Sent => write!(f, "sent"),
            NotifyOutcome::Skipped(reason) => write!(f, "skipped ({})", reason),
            NotifyOutcome::Failed(error) => write!(f, "failed: {}", error),
        }
    }
}

/// 通知器
pub struct Notifier {
    config: NotifierConfig,
    cache: Box<dyn DedupCache>,
    sender: Box<dyn WebhookSender>,
    subject_filter: Option<Regex>,
}

impl Notifier {
    /// 创建通知器
    ///
    /// 主题正则无效时记录警告并视为未配置。
    pub fn new(
        config: NotifierConfig,
        cache: Box<dyn DedupCache>,
        sender: Box<dyn WebhookSender>,
    ) -> Self {
        let subject_filter = match config.subject_filter() {
            Ok(filter) => filter,
            Err(e) => {
                warn!(error = %e, "Invalid subject filter, ignoring");
                None
            }
        };

        Self {
            config,
            cache,
            sender,
            subject_filter,
        }
    }

    /// 按配置创建：文件去重缓存 + HTTP 发送端（或 dry-run）
    pub fn from_config(config: NotifierConfig, dry_run: bool) -> Result<Self> {
        let cache = Box::new(FileDedupStore::new(config.cache_file()));
        let sender: Box<dyn WebhookSender> = if dry_run {
            Box::new(DryRunSender)
        } else {
            Box::new(HttpWebhookSender::new(config.timeout())?)
        };
        Ok(Self::new(config, cache, sender))
    }

    /// 处理 hook 输入；未携带 host 时使用配置中的服务台地址
    pub fn handle_envelope(&self, envelope: &HookEnvelope) -> NotifyOutcome {
        let host = envelope
            .host
            .clone()
            .or_else(|| self.config.host_context());
        self.handle(host.as_ref(), &envelope.event)
    }

    /// 处理单个事件
    pub fn handle<T: TicketView>(
        &self,
        host: Option<&HostContext>,
        event: &TicketEvent<T>,
    ) -> NotifyOutcome {
        let classifier = EventClassifier::new(&self.config, self.cache.as_ref());
        let intent = match classifier.classify(host, event) {
            Classification::Accepted(intent) => intent,
            Classification::Suppressed(reason) => {
                return NotifyOutcome::Skipped(SkipReason::Suppressed(reason));
            }
        };

        // 通过分类意味着宿主和工单都存在
        let Some(host) = host else {
            return NotifyOutcome::Skipped(SkipReason::Suppressed(SuppressReason::HostNotReady));
        };
        let Some(ticket) = event.ticket() else {
            return NotifyOutcome::Skipped(SkipReason::Suppressed(SuppressReason::TicketNotFound));
        };

        let Some(endpoint) = self.config.resolve_endpoint(ticket.dept_id()) else {
            warn!(
                ticket_id = ticket.id(),
                dept_id = ?ticket.dept_id(),
                "No webhook configured, skipping notification"
            );
            return NotifyOutcome::Skipped(SkipReason::NoEndpoint);
        };

        if let Some(filter) = &self.subject_filter {
            if filter.is_match(ticket.subject()) {
                debug!(
                    ticket_id = ticket.id(),
                    pattern = filter.as_str(),
                    "Subject matches ignore rule, skipping notification"
                );
                return NotifyOutcome::Skipped(SkipReason::SubjectIgnored);
            }
        }

        let payload = MessageComposer::new(host, &self.config.message_template)
            .compose(ticket, &intent, Utc::now());

        match self.sender.send(endpoint, &payload) {
            Ok(()) => {
                info!(
                    ticket_id = ticket.id(),
                    kind = %intent.kind,
                    sender = self.sender.name(),
                    "Notification sent"
                );
                NotifyOutcome::Sent
            }
            Err(e) => {
                error!(
                    ticket_id = ticket.id(),
                    endpoint = %redact_endpoint(endpoint),
                    status = ?e.status(),
                    error = %e,
                    "Webhook delivery failed"
                );
                NotifyOutcome::Failed(e.to_string())
            }
        }
    }
}

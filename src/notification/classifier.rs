//! 事件分类器 - 决定一个入站事件是否值得通知
//!
//! 三个入口（新建 / 线程条目 / 对象编辑），两种结果：
//! - `Suppressed(原因)`：不在范围内、重复、或宿主尚未就绪
//! - `Accepted(NotificationIntent)`：需要通知，附带样式和标题
//!
//! 新建工单会先触发 `ticket.created`，紧接着第一条消息又触发
//! `threadentry.created`；状态变化也可能由多个 hook 点上报。分区规则：
//! - 第一条消息只由新建路径处理
//! - 系统条目只由编辑路径处理
//! - 所有通过的结果最后都要经过去重缓存

use std::fmt;
use tracing::{debug, info, warn};

use super::dedup_key::{DedupKey, CREATED_EVENT_KEY};
use super::event::{EditDescriptor, EditedObject, EntryKind, ThreadEntry, TicketEvent};
use super::formatter::{link, strip_markers};
use super::intent::{NotificationIntent, NotificationKind};
use super::store::DedupCache;
use crate::body::to_plain_text;
use crate::config::{HostContext, NotifierConfig};
use crate::ticket::TicketView;

/// 状态名缺失时使用的占位
pub const FALLBACK_STATUS_NAME: &str = "updated";

/// 编辑描述中表示状态变化的 key
const STATUS_EDIT_KEYS: [&str; 4] = ["closed", "reopened", "status", "status_id"];

/// 抑制原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuppressReason {
    /// 宿主运行时上下文尚未初始化
    HostNotReady,
    /// 更新模式不包含此类事件
    ModeExcluded,
    /// 线程条目找不到所属工单
    TicketNotFound,
    /// 工单第一条消息（已由新建事件覆盖）
    FirstMessage,
    /// 非消息 / 回复 / 备注的线程条目
    UnsupportedEntry(EntryKind),
    /// 被编辑的不是工单
    NotATicket(String),
    /// 与状态无关的编辑
    IrrelevantEdit,
    /// 窗口内已经通知过
    Duplicate,
}

impl SuppressReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SuppressReason::HostNotReady => "host_not_ready",
            SuppressReason::ModeExcluded => "mode_excluded",
            SuppressReason::TicketNotFound => "ticket_not_found",
            SuppressReason::FirstMessage => "first_message",
            SuppressReason::UnsupportedEntry(_) => "unsupported_entry",
            SuppressReason::NotATicket(_) => "not_a_ticket",
            SuppressReason::IrrelevantEdit => "irrelevant_edit",
            SuppressReason::Duplicate => "duplicate",
        }
    }
}

impl fmt::Display for SuppressReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 分类结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Suppressed(SuppressReason),
    Accepted(NotificationIntent),
}

impl Classification {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Classification::Accepted(_))
    }
}

/// 事件分类器
pub struct EventClassifier<'a> {
    config: &'a NotifierConfig,
    cache: &'a dyn DedupCache,
}

impl<'a> EventClassifier<'a> {
    pub fn new(config: &'a NotifierConfig, cache: &'a dyn DedupCache) -> Self {
        Self { config, cache }
    }

    /// 对事件分类；通过分类的结果会再经过去重检查
    pub fn classify<T: TicketView>(
        &self,
        host: Option<&HostContext>,
        event: &TicketEvent<T>,
    ) -> Classification {
        let Some(host) = host else {
            warn!(
                event = event.name(),
                ticket_id = ?event.ticket_id(),
                "Notifier called before host context was initialized"
            );
            return Classification::Suppressed(SuppressReason::HostNotReady);
        };

        let candidate = match event {
            TicketEvent::TicketCreated { ticket, .. } => self.classify_created(host, ticket),
            TicketEvent::ThreadEntryAdded { ticket, entry, .. } => {
                self.classify_thread_entry(host, ticket.as_ref(), entry)
            }
            TicketEvent::ObjectEdited { object, edit, .. } => {
                self.classify_edit(host, object, edit)
            }
        };

        let intent = match candidate {
            Ok(intent) => intent,
            Err(reason) => {
                debug!(
                    event = event.name(),
                    ticket_id = ?event.ticket_id(),
                    at = %event.at(),
                    reason = %reason,
                    "Event suppressed"
                );
                return Classification::Suppressed(reason);
            }
        };

        let key = DedupKey::new(intent.ticket_id, intent.event_key.clone());
        if self.cache.is_duplicate(&key, self.config.dedup_window()) {
            return Classification::Suppressed(SuppressReason::Duplicate);
        }

        if matches!(
            intent.kind,
            NotificationKind::StatusClosed
                | NotificationKind::StatusReopened
                | NotificationKind::StatusChanged
        ) {
            info!(
                ticket_id = intent.ticket_id,
                key = %intent.event_key,
                status = ?intent.status_name,
                color = intent.color,
                "Ticket status change accepted"
            );
        }

        Classification::Accepted(intent)
    }

    fn classify_created<T: TicketView>(
        &self,
        host: &HostContext,
        ticket: &T,
    ) -> Result<NotificationIntent, SuppressReason> {
        if !self.config.update_mode.allows_created() {
            return Err(SuppressReason::ModeExcluded);
        }

        Ok(build_intent(
            ticket,
            CREATED_EVENT_KEY.to_string(),
            NotificationKind::Created,
            ticket_heading("New Ticket", host, ticket, "created"),
            to_plain_text(ticket.first_message_body(), ticket.first_message_format()),
            None,
        ))
    }

    fn classify_thread_entry<T: TicketView>(
        &self,
        host: &HostContext,
        ticket: Option<&T>,
        entry: &ThreadEntry,
    ) -> Result<NotificationIntent, SuppressReason> {
        if !self.config.update_mode.allows_updates() {
            return Err(SuppressReason::ModeExcluded);
        }

        let ticket = ticket.ok_or(SuppressReason::TicketNotFound)?;

        if ticket.first_message_id() == Some(entry.id) {
            return Err(SuppressReason::FirstMessage);
        }

        // 系统条目（状态变化等）只走编辑路径
        if !entry.kind.is_conversational() {
            return Err(SuppressReason::UnsupportedEntry(entry.kind));
        }

        let key = DedupKey::thread_entry(ticket.id(), entry.id);
        Ok(build_intent(
            ticket,
            key.event_key,
            NotificationKind::Updated,
            ticket_heading("Ticket", host, ticket, "updated"),
            to_plain_text(&entry.body, entry.format),
            None,
        ))
    }

    fn classify_edit<T: TicketView>(
        &self,
        host: &HostContext,
        object: &EditedObject<T>,
        edit: &EditDescriptor,
    ) -> Result<NotificationIntent, SuppressReason> {
        let ticket = match object {
            EditedObject::Ticket(ticket) => ticket,
            EditedObject::Other(kind) => return Err(SuppressReason::NotATicket(kind.clone())),
        };

        let key = edit.normalized_key();
        let by_key = key
            .as_deref()
            .map_or(false, |k| STATUS_EDIT_KEYS.contains(&k));
        if !by_key && edit.status_id.is_none() {
            return Err(SuppressReason::IrrelevantEdit);
        }

        // 状态名取自工单当前状态，而不是编辑描述
        let status_name = ticket
            .status_name()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(FALLBACK_STATUS_NAME)
            .to_string();

        let kind = status_kind(key.as_deref(), &status_name);
        let dedup = DedupKey::status(ticket.id(), &status_name);
        let heading = ticket_heading(
            "Ticket",
            host,
            ticket,
            &format!("status changed to {}", status_name),
        );

        Ok(build_intent(
            ticket,
            dedup.event_key,
            kind,
            heading,
            ticket.subject().to_string(),
            Some(status_name),
        ))
    }
}

/// 根据编辑 key 和状态名选择状态变化的类型
///
/// 状态名采用不区分大小写的子串匹配，是启发式规则：
/// 名称里恰好包含 closed / resolved / reopen 的自定义状态也会被归类。
pub fn status_kind(edit_key: Option<&str>, status_name: &str) -> NotificationKind {
    let lower = status_name.to_lowercase();

    if edit_key == Some("closed") || lower.contains("closed") || lower.contains("resolved") {
        NotificationKind::StatusClosed
    } else if edit_key == Some("reopened") || lower.contains("reopen") {
        NotificationKind::StatusReopened
    } else {
        NotificationKind::StatusChanged
    }
}

/// `<label> <链接:#number> <suffix>`，链接用保留标记包裹
fn ticket_heading<T: TicketView>(
    label: &str,
    host: &HostContext,
    ticket: &T,
    suffix: &str,
) -> String {
    format!(
        "{} {} {}",
        label,
        link(&host.ticket_url(ticket.id()), &format!("#{}", ticket.number())),
        strip_markers(suffix)
    )
}

fn build_intent<T: TicketView>(
    ticket: &T,
    event_key: String,
    kind: NotificationKind,
    heading: String,
    body: String,
    status_name: Option<String>,
) -> NotificationIntent {
    NotificationIntent {
        ticket_id: ticket.id(),
        event_key,
        kind,
        heading,
        body,
        status_name,
        color: kind.color(),
        shape: kind.shape(),
    }
}

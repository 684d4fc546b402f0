//! 入站事件结构
//!
//! 宿主系统的三种信号对应三个变体，每个变体只携带它能保证提供的字段。
//! JSON 以 `type` 字段区分：`ticket.created` / `threadentry.created` / `object.edited`。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::body::BodyFormat;
use crate::config::HostContext;
use crate::ticket::{TicketSnapshot, TicketView};

/// 入站事件
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum TicketEvent<T = TicketSnapshot> {
    /// 新建工单（至少包含一条消息）
    #[serde(rename = "ticket.created")]
    TicketCreated {
        ticket: T,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
    /// 新的线程条目（消息 / 回复 / 备注 / 系统事件）
    #[serde(rename = "threadentry.created")]
    ThreadEntryAdded {
        /// 条目所属工单；宿主查不到时为空
        ticket: Option<T>,
        entry: ThreadEntry,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
    /// 对象被编辑（状态旗标等）
    #[serde(rename = "object.edited")]
    ObjectEdited {
        object: EditedObject<T>,
        #[serde(default)]
        edit: EditDescriptor,
        #[serde(default = "Utc::now")]
        at: DateTime<Utc>,
    },
}

/// 线程条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ThreadEntry {
    pub id: u64,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    /// 原文；默认是宿主清洗过的 HTML
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub format: BodyFormat,
}

/// 线程条目类型
///
/// 宿主使用单字母代码（M/R/N/E），这里同时接受完整名称。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    #[serde(alias = "M")]
    Message,
    #[serde(alias = "R")]
    Response,
    #[serde(alias = "N")]
    Note,
    #[serde(alias = "E")]
    System,
    #[serde(other)]
    Other,
}

impl EntryKind {
    /// 用户消息、客服回复和内部备注会发通知；系统条目只走编辑路径
    pub fn is_conversational(&self) -> bool {
        matches!(self, EntryKind::Message | EntryKind::Response | EntryKind::Note)
    }
}

/// 被编辑的对象
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum EditedObject<T = TicketSnapshot> {
    Ticket(T),
    /// 其他对象（任务等），值为对象类型
    Other(String),
}

/// 编辑描述
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct EditDescriptor {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub status_id: Option<u64>,
}

impl EditDescriptor {
    pub fn with_key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            status_id: None,
        }
    }

    /// 小写化后的 key
    pub fn normalized_key(&self) -> Option<String> {
        self.key
            .as_deref()
            .map(|k| k.trim().to_lowercase())
            .filter(|k| !k.is_empty())
    }
}

impl<T: TicketView> TicketEvent<T> {
    /// 创建新建工单事件
    pub fn created(ticket: T) -> Self {
        TicketEvent::TicketCreated {
            ticket,
            at: Utc::now(),
        }
    }

    /// 创建线程条目事件
    pub fn thread_entry(ticket: Option<T>, entry: ThreadEntry) -> Self {
        TicketEvent::ThreadEntryAdded {
            ticket,
            entry,
            at: Utc::now(),
        }
    }

    /// 创建工单编辑事件
    pub fn ticket_edited(ticket: T, edit: EditDescriptor) -> Self {
        TicketEvent::ObjectEdited {
            object: EditedObject::Ticket(ticket),
            edit,
            at: Utc::now(),
        }
    }

    /// 事件名（与宿主信号同名）
    pub fn name(&self) -> &'static str {
        match self {
            TicketEvent::TicketCreated { .. } => "ticket.created",
            TicketEvent::ThreadEntryAdded { .. } => "threadentry.created",
            TicketEvent::ObjectEdited { .. } => "object.edited",
        }
    }

    /// 事件关联的工单（如果有）
    pub fn ticket(&self) -> Option<&T> {
        match self {
            TicketEvent::TicketCreated { ticket, .. } => Some(ticket),
            TicketEvent::ThreadEntryAdded { ticket, .. } => ticket.as_ref(),
            TicketEvent::ObjectEdited { object, .. } => match object {
                EditedObject::Ticket(ticket) => Some(ticket),
                EditedObject::Other(_) => None,
            },
        }
    }

    pub fn ticket_id(&self) -> Option<u64> {
        self.ticket().map(|t| t.id())
    }

    /// 事件源时间
    pub fn at(&self) -> DateTime<Utc> {
        match self {
            TicketEvent::TicketCreated { at, .. }
            | TicketEvent::ThreadEntryAdded { at, .. }
            | TicketEvent::ObjectEdited { at, .. } => *at,
        }
    }
}

/// hook 输入（stdin JSON）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HookEnvelope {
    /// 宿主运行时上下文，缺省时使用配置中的 helpdesk_url
    #[serde(default)]
    pub host: Option<HostContext>,
    pub event: TicketEvent,
}

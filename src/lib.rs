//! Ticket Slack Notify - 把服务台工单事件推送到 Slack webhook

pub mod body;
pub mod cli;
pub mod config;
pub mod notification;
pub mod template;
pub mod ticket;

pub use config::{HostContext, NotifierConfig, UpdateMode};
pub use ticket::{FirstMessage, TicketSnapshot, TicketView};
pub use notification::{
    DedupCache, DedupKey, FileDedupStore, HookEnvelope, MemoryDedupStore, Notifier,
    NotifyOutcome, SkipReason, SuppressReason, TicketEvent, WebhookPayload, WebhookSender,
};

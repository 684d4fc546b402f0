//! 通知层 - 把工单事件转成 Slack webhook 消息
//!
//! # 流程
//! 1. `EventClassifier`：判断事件是否在范围内，并经过去重缓存
//! 2. `NotifierConfig::resolve_endpoint`：按部门选择 webhook
//! 3. 主题忽略规则
//! 4. `MessageComposer`：组装附件
//! 5. `WebhookSender`：发送
//!
//! # 使用示例
//! ```ignore
//! use ticket_slack_notify::notification::{Notifier, TicketEvent};
//!
//! let notifier = Notifier::from_config(config, false)?;
//! let outcome = notifier.handle(Some(&host), &TicketEvent::created(ticket));
//! ```

pub mod classifier;
pub mod dedup_key;
pub mod deduplicator;
pub mod dispatcher;
pub mod event;
pub mod formatter;
pub mod intent;
pub mod payload;
pub mod store;
pub mod webhook;

pub use classifier::{Classification, EventClassifier, SuppressReason};
pub use dedup_key::DedupKey;
pub use deduplicator::MemoryDedupStore;
pub use dispatcher::{Notifier, NotifyOutcome, SkipReason};
pub use event::{EditDescriptor, EditedObject, EntryKind, HookEnvelope, ThreadEntry, TicketEvent};
pub use formatter::format_text;
pub use intent::{MessageShape, NotificationIntent, NotificationKind};
pub use payload::{Attachment, AttachmentField, MessageComposer, WebhookPayload};
pub use store::{DedupCache, FileDedupStore};
pub use webhook::{DeliveryError, DryRunSender, HttpWebhookSender, WebhookSender};

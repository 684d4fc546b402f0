//! 通知配置
//!
//! 配置文件为 JSON，默认位置 `~/.config/ticket-slack-notify/config.json`。
//! 字段名兼容旧插件的配置键（如 `slack-webhook-url`）。
//!
//! 配置在进程启动时解析一次，之后以引用形式显式传给分类器、组装器和发送端，
//! 不存在全局的"当前配置实例"。

use anyhow::{anyhow, Context, Result};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::notification::webhook::redact_endpoint;

/// 默认去重窗口（秒）
pub const DEFAULT_DEDUP_WINDOW_SECS: u64 = 3;

/// 默认 HTTP 超时（秒）
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// 默认消息模板：只放入经过转义的事件正文
pub const DEFAULT_MESSAGE_TEMPLATE: &str = "%{slack_safe_message}";

/// 去重缓存文件名（位于系统临时目录）
pub const CACHE_FILE_NAME: &str = "ticket_slack_notify_cache.json";

/// 更新模式：决定哪些事件会发送通知
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum UpdateMode {
    /// 新建和更新都通知（空值也视为 both）
    #[default]
    Both,
    /// 只通知新建工单
    NewOnly,
    /// 只通知工单更新
    UpdatesOnly,
}

impl UpdateMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateMode::Both => "both",
            UpdateMode::NewOnly => "newOnly",
            UpdateMode::UpdatesOnly => "updatesOnly",
        }
    }

    /// 是否通知新建工单
    pub fn allows_created(&self) -> bool {
        !matches!(self, UpdateMode::UpdatesOnly)
    }

    /// 是否通知线程更新
    pub fn allows_updates(&self) -> bool {
        !matches!(self, UpdateMode::NewOnly)
    }
}

impl fmt::Display for UpdateMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for UpdateMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim() {
            "" | "both" => Ok(UpdateMode::Both),
            "newOnly" => Ok(UpdateMode::NewOnly),
            "updatesOnly" => Ok(UpdateMode::UpdatesOnly),
            other => Err(format!(
                "unknown update mode '{}' (expected both, newOnly or updatesOnly)",
                other
            )),
        }
    }
}

impl From<UpdateMode> for String {
    fn from(mode: UpdateMode) -> Self {
        mode.as_str().to_string()
    }
}

/// 宿主运行时上下文
///
/// 宿主尚未初始化（早期启动 hook）时不存在，此时所有事件都会被抑制。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostContext {
    /// 服务台根地址，如 `https://help.example.com/`
    pub helpdesk_url: String,
}

impl HostContext {
    pub fn new(helpdesk_url: impl Into<String>) -> Self {
        Self {
            helpdesk_url: helpdesk_url.into(),
        }
    }

    /// 客服端工单详情页链接
    pub fn ticket_url(&self, ticket_id: u64) -> String {
        format!(
            "{}/scp/tickets.php?id={}",
            self.helpdesk_url.trim_end_matches('/'),
            ticket_id
        )
    }
}

/// 通知配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// 更新模式
    #[serde(alias = "slack-update-types")]
    pub update_mode: UpdateMode,
    /// 默认 webhook 地址
    #[serde(alias = "slack-webhook-url")]
    pub webhook_url: String,
    /// 部门 ID -> webhook 地址
    pub department_webhooks: HashMap<u32, String>,
    /// 消息模板
    #[serde(alias = "message-template")]
    pub message_template: String,
    /// 主题忽略正则（大小写不敏感）
    #[serde(alias = "slack-regex-subject-ignore")]
    pub subject_ignore: Option<String>,
    /// 服务台地址（hook 输入未携带 host 时使用）
    pub helpdesk_url: Option<String>,
    /// 去重窗口（秒）
    pub dedup_window_secs: u64,
    /// HTTP 超时（秒）
    pub timeout_secs: u64,
    /// 去重缓存文件路径
    pub cache_path: Option<PathBuf>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            update_mode: UpdateMode::Both,
            webhook_url: String::new(),
            department_webhooks: HashMap::new(),
            message_template: DEFAULT_MESSAGE_TEMPLATE.to_string(),
            subject_ignore: None,
            helpdesk_url: None,
            dedup_window_secs: DEFAULT_DEDUP_WINDOW_SECS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            cache_path: None,
        }
    }
}

impl NotifierConfig {
    /// 默认配置文件路径
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join("ticket-slack-notify")
            .join("config.json")
    }

    /// 加载配置：文件（不存在则使用默认值）+ 环境变量覆盖，最后校验
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_path);

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read config {}", path.display()))?;
            Self::from_json_str(&content)
                .with_context(|| format!("invalid config {}", path.display()))?
        } else {
            debug!(path = %path.display(), "Config file not found, using defaults");
            Self::default()
        };

        config.apply_overrides_from(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    /// 从 JSON 字符串解析（不做校验）
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// 应用环境变量覆盖
    ///
    /// - `TSN_WEBHOOK_URL` → 默认 webhook
    /// - `TSN_HELPDESK_URL` → 服务台地址
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("TSN_WEBHOOK_URL").filter(|u| !u.trim().is_empty()) {
            debug!("Using TSN_WEBHOOK_URL from environment");
            self.webhook_url = url;
        }
        if let Some(url) = lookup("TSN_HELPDESK_URL").filter(|u| !u.trim().is_empty()) {
            debug!("Using TSN_HELPDESK_URL from environment");
            self.helpdesk_url = Some(url);
        }
    }

    /// 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.dedup_window_secs == 0 {
            return Err(anyhow!("dedup_window_secs must be greater than 0"));
        }
        if self.timeout_secs == 0 {
            return Err(anyhow!("timeout_secs must be greater than 0"));
        }
        self.subject_filter()?;
        Ok(())
    }

    /// 编译主题忽略正则；未配置或为空时返回 None
    pub fn subject_filter(&self) -> Result<Option<Regex>> {
        let pattern = match self.subject_ignore.as_deref().map(str::trim) {
            Some(p) if !p.is_empty() => p,
            _ => return Ok(None),
        };
        let re = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .with_context(|| format!("invalid subject_ignore regex '{}'", pattern))?;
        Ok(Some(re))
    }

    /// 根据部门选择 webhook，找不到时回落到默认地址
    ///
    /// 空字符串视为未配置。返回 None 表示没有可用地址。
    pub fn resolve_endpoint(&self, dept_id: Option<u32>) -> Option<&str> {
        dept_id
            .and_then(|id| self.department_webhooks.get(&id))
            .map(|url| url.trim())
            .filter(|url| !url.is_empty())
            .or_else(|| Some(self.webhook_url.trim()).filter(|url| !url.is_empty()))
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_secs(self.dedup_window_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// 去重缓存文件路径
    pub fn cache_file(&self) -> PathBuf {
        self.cache_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(CACHE_FILE_NAME))
    }

    /// 由配置中的服务台地址构造宿主上下文
    pub fn host_context(&self) -> Option<HostContext> {
        self.helpdesk_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(HostContext::new)
    }

    /// 用于展示的配置（webhook 地址脱敏）
    pub fn redacted(&self) -> serde_json::Value {
        let departments: HashMap<String, String> = self
            .department_webhooks
            .iter()
            .map(|(id, url)| (id.to_string(), redact_endpoint(url)))
            .collect();

        serde_json::json!({
            "update_mode": self.update_mode.as_str(),
            "webhook_url": redact_endpoint(&self.webhook_url),
            "department_webhooks": departments,
            "message_template": self.message_template,
            "subject_ignore": self.subject_ignore,
            "helpdesk_url": self.helpdesk_url,
            "dedup_window_secs": self.dedup_window_secs,
            "timeout_secs": self.timeout_secs,
            "cache_path": self.cache_file().display().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = NotifierConfig::default();
        assert_eq!(config.update_mode, UpdateMode::Both);
        assert_eq!(config.dedup_window(), Duration::from_secs(3));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.message_template, "%{slack_safe_message}");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_update_mode_parsing() {
        let parse = |s: &str| UpdateMode::try_from(s.to_string());
        assert_eq!(parse("both"), Ok(UpdateMode::Both));
        assert_eq!(parse(""), Ok(UpdateMode::Both));
        assert_eq!(parse("newOnly"), Ok(UpdateMode::NewOnly));
        assert_eq!(parse("updatesOnly"), Ok(UpdateMode::UpdatesOnly));
        assert!(parse("sometimes").is_err());
    }

    #[test]
    fn test_update_mode_scope() {
        assert!(UpdateMode::Both.allows_created());
        assert!(UpdateMode::Both.allows_updates());
        assert!(UpdateMode::NewOnly.allows_created());
        assert!(!UpdateMode::NewOnly.allows_updates());
        assert!(!UpdateMode::UpdatesOnly.allows_created());
        assert!(UpdateMode::UpdatesOnly.allows_updates());
    }

    #[test]
    fn test_parse_legacy_plugin_keys() {
        let json = r#"{
            "slack-update-types": "newOnly",
            "slack-webhook-url": "https://hooks.slack.com/services/T/B/X",
            "message-template": "%{ticket.number}: %{slack_safe_message}",
            "slack-regex-subject-ignore": "^\\[spam\\]",
            "department_webhooks": {"2": "https://hooks.slack.com/services/T/B/SALES"}
        }"#;
        let config = NotifierConfig::from_json_str(json).unwrap();
        assert_eq!(config.update_mode, UpdateMode::NewOnly);
        assert_eq!(config.webhook_url, "https://hooks.slack.com/services/T/B/X");
        assert_eq!(config.subject_ignore.as_deref(), Some("^\\[spam\\]"));
        assert_eq!(
            config.department_webhooks.get(&2).map(String::as_str),
            Some("https://hooks.slack.com/services/T/B/SALES")
        );
        // 未出现的字段使用默认值
        assert_eq!(config.dedup_window_secs, DEFAULT_DEDUP_WINDOW_SECS);
    }

    #[test]
    fn test_parse_rejects_unknown_update_mode() {
        let json = r#"{"update_mode": "always"}"#;
        assert!(NotifierConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_resolve_endpoint_prefers_department() {
        let mut config = NotifierConfig {
            webhook_url: "https://default".to_string(),
            ..Default::default()
        };
        config.department_webhooks.insert(1, "https://support".to_string());
        config.department_webhooks.insert(3, "   ".to_string());

        assert_eq!(config.resolve_endpoint(Some(1)), Some("https://support"));
        // 部门地址为空 → 回落默认
        assert_eq!(config.resolve_endpoint(Some(3)), Some("https://default"));
        assert_eq!(config.resolve_endpoint(Some(9)), Some("https://default"));
        assert_eq!(config.resolve_endpoint(None), Some("https://default"));
    }

    #[test]
    fn test_resolve_endpoint_none_when_unconfigured() {
        let config = NotifierConfig::default();
        assert_eq!(config.resolve_endpoint(Some(1)), None);
        assert_eq!(config.resolve_endpoint(None), None);
    }

    #[test]
    fn test_subject_filter_is_case_insensitive() {
        let config = NotifierConfig {
            subject_ignore: Some("^\\[spam\\]".to_string()),
            ..Default::default()
        };
        let re = config.subject_filter().unwrap().unwrap();
        assert!(re.is_match("[SPAM] buy now"));
        assert!(!re.is_match("printer [spam]"));
    }

    #[test]
    fn test_empty_subject_filter_is_none() {
        let config = NotifierConfig {
            subject_ignore: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(config.subject_filter().unwrap().is_none());
    }

    #[test]
    fn test_validate_rejects_bad_regex_and_zero_window() {
        let bad_regex = NotifierConfig {
            subject_ignore: Some("([".to_string()),
            ..Default::default()
        };
        assert!(bad_regex.validate().is_err());

        let zero_window = NotifierConfig {
            dedup_window_secs: 0,
            ..Default::default()
        };
        assert!(zero_window.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = NotifierConfig::default();
        config.apply_overrides_from(|name| match name {
            "TSN_WEBHOOK_URL" => Some("https://env-hook".to_string()),
            "TSN_HELPDESK_URL" => Some("https://help.example.com/".to_string()),
            _ => None,
        });
        assert_eq!(config.webhook_url, "https://env-hook");
        assert_eq!(
            config.host_context(),
            Some(HostContext::new("https://help.example.com/"))
        );
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = NotifierConfig::load(Some(&dir.path().join("missing.json"))).unwrap();
        assert_eq!(config.update_mode, UpdateMode::Both);
    }

    #[test]
    fn test_load_reports_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        let err = NotifierConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{:#}", err).contains("invalid config"));
    }

    #[test]
    fn test_ticket_url_handles_trailing_slash() {
        let with_slash = HostContext::new("https://help.example.com/");
        let without = HostContext::new("https://help.example.com");
        assert_eq!(with_slash.ticket_url(42), "https://help.example.com/scp/tickets.php?id=42");
        assert_eq!(without.ticket_url(42), "https://help.example.com/scp/tickets.php?id=42");
    }
}

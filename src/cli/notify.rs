//! notify 命令 - 接收宿主 hook 事件并发送通知
//!
//! 从 stdin 读取 `HookEnvelope` JSON。管道的任何结果（包括输入格式错误）
//! 都只记录日志，命令总是以 0 退出，不影响触发它的工单操作。

use anyhow::Result;
use clap::Args;
use std::path::{Path, PathBuf};
use tracing::{error, warn};

use super::output::format_json;
use crate::config::NotifierConfig;
use crate::notification::{HookEnvelope, Notifier, NotifyOutcome};

/// notify 命令参数
#[derive(Args, Debug)]
pub struct NotifyArgs {
    /// 配置文件路径（默认 ~/.config/ticket-slack-notify/config.json）
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Dry-run 模式（只打印 payload 不发送）
    #[arg(long)]
    pub dry_run: bool,

    /// 以 JSON 输出结果
    #[arg(long)]
    pub json: bool,
}

/// 处理 notify 命令
pub fn handle_notify(args: NotifyArgs) -> Result<()> {
    let input = match std::io::read_to_string(std::io::stdin()) {
        Ok(input) => input,
        Err(e) => {
            warn!(error = %e, "Failed to read hook input from stdin");
            String::new()
        }
    };

    let outcome = notify_from_str(args.config.as_deref(), args.dry_run, &input);

    if args.json {
        println!("{}", format_json(&outcome.to_json()));
    }

    Ok(())
}

/// 解析输入并运行管道
pub fn notify_from_str(config_path: Option<&Path>, dry_run: bool, input: &str) -> NotifyOutcome {
    let config = match NotifierConfig::load(config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Failed to load config");
            return NotifyOutcome::Failed(format!("config: {:#}", e));
        }
    };

    let envelope: HookEnvelope = match serde_json::from_str(input) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!(error = %e, input_len = input.len(), "Malformed hook input");
            return NotifyOutcome::Failed(format!("invalid hook input: {}", e));
        }
    };

    let notifier = match Notifier::from_config(config, dry_run) {
        Ok(notifier) => notifier,
        Err(e) => {
            error!(error = %e, "Failed to create notifier");
            return NotifyOutcome::Failed(e.to_string());
        }
    };

    notifier.handle_envelope(&envelope)
}

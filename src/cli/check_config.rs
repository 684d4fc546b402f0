//! check-config 命令 - 校验配置并打印解析结果

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use super::output::format_json;
use crate::config::NotifierConfig;

/// check-config 命令参数
#[derive(Args, Debug)]
pub struct CheckConfigArgs {
    /// 配置文件路径
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// 处理 check-config 命令；配置无效时返回错误（非 0 退出）
pub fn handle_check_config(args: CheckConfigArgs) -> Result<()> {
    let path = args.config.unwrap_or_else(NotifierConfig::default_path);
    let config = NotifierConfig::load(Some(&path))?;

    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("(not found, using defaults)");
    }
    println!("{}", format_json(&config.redacted()));

    if config.resolve_endpoint(None).is_none() && config.department_webhooks.is_empty() {
        println!("⚠️  No webhook configured, notifications will be skipped");
    }
    if config.host_context().is_none() {
        println!("⚠️  No helpdesk_url configured, hook input must carry host context");
    }

    Ok(())
}

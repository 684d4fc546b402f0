//! Ticket Slack Notify CLI
//!
//! 由服务台 hook 调用，把工单新建 / 更新 / 状态变化推送到 Slack

use anyhow::Result;
use clap::{Parser, Subcommand};
use ticket_slack_notify::cli::{
    handle_cache, handle_check_config, handle_notify, CacheArgs, CheckConfigArgs, NotifyArgs,
};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tsn")]
#[command(about = "Ticket Slack Notify - 工单事件 Slack 通知")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 从 stdin 读取 hook 事件并发送通知
    Notify(NotifyArgs),
    /// 校验配置并打印解析结果（webhook 地址脱敏）
    CheckConfig(CheckConfigArgs),
    /// 查看或清空去重缓存
    Cache(CacheArgs),
}

fn main() -> Result<()> {
    // 日志写到 stderr，stdout 留给命令输出
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ticket_slack_notify=info,tsn=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Notify(args) => handle_notify(args),
        Commands::CheckConfig(args) => handle_check_config(args),
        Commands::Cache(args) => handle_cache(args),
    }
}

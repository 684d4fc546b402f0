//! cache 命令 - 查看或清空去重缓存文件

use anyhow::Result;
use chrono::Utc;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::output::{format_json, format_timestamp};
use crate::config::NotifierConfig;
use crate::notification::FileDedupStore;

/// cache 命令参数
#[derive(Args, Debug)]
pub struct CacheArgs {
    #[command(subcommand)]
    pub action: CacheAction,

    /// 配置文件路径
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// 列出缓存记录
    Show {
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
    /// 删除缓存文件
    Clear,
}

/// 处理 cache 命令
pub fn handle_cache(args: CacheArgs) -> Result<()> {
    let config = NotifierConfig::load(args.config.as_deref())?;
    let store = FileDedupStore::new(config.cache_file());

    match args.action {
        CacheAction::Show { json } => {
            let entries = store.entries()?;
            if json {
                println!("{}", format_json(&entries));
                return Ok(());
            }

            println!("Cache file: {}", store.path().display());
            if entries.is_empty() {
                println!("(empty)");
                return Ok(());
            }

            let now = Utc::now().timestamp();
            let mut rows: Vec<_> = entries.into_iter().collect();
            rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
            for (key, ts) in rows {
                println!("{:<40} {}", key, format_timestamp(ts, now));
            }
        }
        CacheAction::Clear => {
            store.clear()?;
            println!("Cleared {}", store.path().display());
        }
    }

    Ok(())
}

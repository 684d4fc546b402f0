//! 去重存储 - 跨进程共享的 JSON 缓存文件（带文件锁）
//!
//! 文件内容是一个 JSON 对象：`{"<ticketId>|<eventKey>": <unix 时间戳>}`。
//! 多个 hook 进程可能同时处理同一工单，因此"读取-检查-更新-写回"整个过程
//! 都在排他文件锁内完成，且任何退出路径都会释放锁。
//!
//! 缓存只是优化，不是消息投递的正确性保证：文件打不开、锁不上、写不进去时
//! 一律按"不重复"处理（fail open），只记录 warn 日志。

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use fs2::FileExt;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::hash::Hash;
use std::io::{ErrorKind, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};

use super::dedup_key::DedupKey;

/// 获取锁的最大尝试次数
pub const LOCK_ATTEMPTS: u32 = 50;

/// 两次尝试之间的间隔
pub const LOCK_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// 超过 `窗口 × GC_FACTOR` 的记录会在下次写入时清理
pub const GC_FACTOR: i64 = 10;

/// 去重缓存
pub trait DedupCache: Send + Sync {
    /// 检查 key 是否在窗口内已经通知过
    ///
    /// 返回 `false` 时会原子地记录当前时间，并顺带清理过期记录。
    fn is_duplicate(&self, key: &DedupKey, window: Duration) -> bool;
}

/// 在映射上执行一次"检查-记录-清理"
///
/// 返回 `true` 表示重复（映射不变），`false` 表示已记录 `now`。
/// 晚于 `now` 的时间戳（文件损坏或时钟回拨）视为过期，并在清理时移除。
pub(crate) fn check_and_record<K>(
    entries: &mut HashMap<K, i64>,
    key: &K,
    window_secs: i64,
    now: i64,
) -> bool
where
    K: Eq + Hash + Clone,
{
    if let Some(&last) = entries.get(key) {
        if age(now, last).map_or(false, |age| age < window_secs) {
            return true;
        }
    }

    entries.insert(key.clone(), now);

    let horizon = window_secs.saturating_mul(GC_FACTOR);
    entries.retain(|_, ts| age(now, *ts).map_or(false, |age| age <= horizon));
    false
}

/// 记录距今秒数；来自未来的记录返回 None
fn age(now: i64, ts: i64) -> Option<i64> {
    if ts > now {
        return None;
    }
    Some(now.saturating_sub(ts))
}

pub(crate) fn window_secs(window: Duration) -> i64 {
    i64::try_from(window.as_secs()).unwrap_or(i64::MAX)
}

/// 文件去重存储
#[derive(Debug, Clone)]
pub struct FileDedupStore {
    path: PathBuf,
    lock_attempts: u32,
    retry_interval: Duration,
}

impl FileDedupStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock_attempts: LOCK_ATTEMPTS,
            retry_interval: LOCK_RETRY_INTERVAL,
        }
    }

    /// 设置获取锁的重试策略
    pub fn with_lock_retry(mut self, attempts: u32, interval: Duration) -> Self {
        self.lock_attempts = attempts.max(1);
        self.retry_interval = interval;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 指定当前时间（unix 秒）的去重检查
    pub fn is_duplicate_at(&self, key: &DedupKey, window: Duration, now: i64) -> bool {
        let storage_key = key.storage_key();
        let window_secs = window_secs(window);

        let result = self.with_locked_cache(|entries| {
            let duplicate = check_and_record(entries, &storage_key, window_secs, now);
            // 重复时映射没有变化，不需要写回
            Ok((duplicate, !duplicate))
        });

        match result {
            Ok(duplicate) => {
                if duplicate {
                    debug!(key = %key, "Notification deduplicated (recent entry in cache)");
                }
                duplicate
            }
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    key = %key,
                    error = %format!("{:#}", e),
                    "Dedup cache unavailable, treating as not duplicate"
                );
                false
            }
        }
    }

    /// 读取当前所有记录（文件不存在时为空）
    pub fn entries(&self) -> Result<HashMap<String, i64>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        self.with_locked_cache(|entries| Ok((entries.clone(), false)))
    }

    /// 清空缓存
    ///
    /// 在文件锁内截断为空对象，而不是删除文件：其他进程可能正持有同一个文件的锁。
    pub fn clear(&self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        self.with_locked_cache(|entries| {
            entries.clear();
            Ok(((), true))
        })
    }

    /// 在文件锁保护下执行缓存的读-改-写操作
    ///
    /// `operation` 返回 `(结果, 是否需要写回)`。锁在任何情况下都会释放。
    fn with_locked_cache<F, T>(&self, operation: F) -> Result<T>
    where
        F: FnOnce(&mut HashMap<String, i64>) -> Result<(T, bool)>,
    {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(&self.path)
            .with_context(|| format!("failed to open {}", self.path.display()))?;

        self.lock(&file)?;

        let result = (|| {
            let mut entries = self.read_entries(&mut file);
            let (value, dirty) = operation(&mut entries)?;
            if dirty {
                Self::write_entries(&mut file, &entries)?;
            }
            Ok(value)
        })();

        // 释放锁
        let _ = file.unlock();

        result
    }

    /// 有限次数的非阻塞加锁，避免调用方被无限期挂起
    fn lock(&self, file: &File) -> Result<()> {
        let contended = fs2::lock_contended_error().raw_os_error();

        for attempt in 1..=self.lock_attempts {
            match file.try_lock_exclusive() {
                Ok(()) => return Ok(()),
                Err(e) if e.raw_os_error() == contended || e.kind() == ErrorKind::WouldBlock => {
                    if attempt < self.lock_attempts {
                        thread::sleep(self.retry_interval);
                    }
                }
                Err(e) => {
                    return Err(e).context("failed to lock dedup cache");
                }
            }
        }

        Err(anyhow!(
            "dedup cache lock still held after {} attempts",
            self.lock_attempts
        ))
    }

    /// 读取缓存内容；不可读、为空或损坏时视为空缓存
    fn read_entries(&self, file: &mut File) -> HashMap<String, i64> {
        let mut content = String::new();
        let read = match file.seek(SeekFrom::Start(0)) {
            Ok(_) => file.read_to_string(&mut content),
            Err(e) => Err(e),
        };
        if let Err(e) = read {
            warn!(
                path = %self.path.display(),
                error = %e,
                "Failed to read dedup cache, starting empty"
            );
            return HashMap::new();
        }

        if content.trim().is_empty() {
            return HashMap::new();
        }

        match serde_json::from_str::<serde_json::Value>(&content) {
            Ok(serde_json::Value::Object(map)) => map
                .into_iter()
                .filter_map(|(k, v)| v.as_i64().map(|ts| (k, ts)))
                .collect(),
            _ => {
                warn!(path = %self.path.display(), "Dedup cache is corrupt, starting empty");
                HashMap::new()
            }
        }
    }

    fn write_entries(file: &mut File, entries: &HashMap<String, i64>) -> Result<()> {
        let content = serde_json::to_vec(entries)?;
        file.set_len(0)?;
        file.seek(SeekFrom::Start(0))?;
        file.write_all(&content)?;
        file.flush()?;
        Ok(())
    }
}

impl DedupCache for FileDedupStore {
    fn is_duplicate(&self, key: &DedupKey, window: Duration) -> bool {
        self.is_duplicate_at(key, window, Utc::now().timestamp())
    }
}

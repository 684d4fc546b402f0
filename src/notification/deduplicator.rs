//! 内存去重器 - 单进程部署时替代文件缓存
//!
//! 与 `FileDedupStore` 相同的契约：窗口内同一 key 只放行一次，放行时记录时间
//! 并清理超过 10 倍窗口的记录。互斥锁中毒时按"不重复"放行。

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, warn};

use super::dedup_key::DedupKey;
use super::store::{check_and_record, window_secs, DedupCache};

/// 内存去重器
#[derive(Debug, Default)]
pub struct MemoryDedupStore {
    /// key -> 最近通知的 unix 时间戳
    recent: Mutex<HashMap<DedupKey, i64>>,
}

impl MemoryDedupStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 指定当前时间（unix 秒）的去重检查
    pub fn is_duplicate_at(&self, key: &DedupKey, window: Duration, now: i64) -> bool {
        let mut recent = match self.recent.lock() {
            Ok(guard) => guard,
            Err(_) => {
                warn!(key = %key, "Dedup map poisoned, treating as not duplicate");
                return false;
            }
        };

        let duplicate = check_and_record(&mut *recent, key, window_secs(window), now);
        if duplicate {
            debug!(key = %key, "Notification deduplicated (recent entry in memory)");
        }
        duplicate
    }

    /// 当前记录数
    pub fn len(&self) -> usize {
        self.recent.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DedupCache for MemoryDedupStore {
    fn is_duplicate(&self, key: &DedupKey, window: Duration) -> bool {
        self.is_duplicate_at(key, window, Utc::now().timestamp())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    const WINDOW: Duration = Duration::from_secs(3);

    #[test]
    fn test_same_key_within_window_is_deduplicated() {
        let dedup = MemoryDedupStore::new();
        let key = DedupKey::created(42);

        assert!(!dedup.is_duplicate_at(&key, WINDOW, 100));
        assert!(dedup.is_duplicate_at(&key, WINDOW, 101));
        assert!(dedup.is_duplicate_at(&key, WINDOW, 102));
    }

    #[test]
    fn test_window_expiry_allows_resend() {
        let dedup = MemoryDedupStore::new();
        let key = DedupKey::thread_entry(42, 9);

        assert!(!dedup.is_duplicate_at(&key, WINDOW, 100));
        assert!(!dedup.is_duplicate_at(&key, WINDOW, 103));
    }

    #[test]
    fn test_different_tickets_same_event_not_deduplicated() {
        let dedup = MemoryDedupStore::new();

        assert!(!dedup.is_duplicate_at(&DedupKey::status(1, "Closed"), WINDOW, 100));
        assert!(!dedup.is_duplicate_at(&DedupKey::status(2, "Closed"), WINDOW, 100));
        assert!(dedup.is_duplicate_at(&DedupKey::status(1, "Closed"), WINDOW, 100));
    }

    #[test]
    fn test_cleanup_expired_records() {
        let dedup = MemoryDedupStore::new();

        dedup.is_duplicate_at(&DedupKey::created(1), WINDOW, 100);
        dedup.is_duplicate_at(&DedupKey::created(2), WINDOW, 100);
        assert_eq!(dedup.len(), 2);

        // 超过 10 倍窗口后，下一次写入会清理旧记录
        dedup.is_duplicate_at(&DedupKey::created(3), WINDOW, 131);
        assert_eq!(dedup.len(), 1);
    }

    #[test]
    fn test_concurrent_callers_only_one_wins() {
        let dedup = Arc::new(MemoryDedupStore::new());

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let dedup = Arc::clone(&dedup);
                thread::spawn(move || dedup.is_duplicate_at(&DedupKey::created(5), WINDOW, 100))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|dup| !dup)
            .count();
        assert_eq!(winners, 1);
    }
}

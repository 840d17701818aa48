//! 私信去重
//!
//! Slack 可能重投同一条消息；以 `client_msg_id` 为键，首次 `claim` 成功才处理。
//! `claim` 是原子的检查并插入，即使将来改为并发处理也不会重复回复。

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// 去重存储
pub trait DedupStore: Send + Sync {
    /// 首次见到该 ID 时记录并返回 true；已存在返回 false
    fn claim(&self, id: &str) -> bool;
}

#[derive(Debug, Default)]
struct Seen {
    ids: HashSet<String>,
    /// 插入顺序，用于容量满时淘汰最旧的 ID
    order: VecDeque<String>,
}

/// 内存去重集合；`capacity` 为 0 时不淘汰（无限增长）
#[derive(Debug)]
pub struct MemoryDedupStore {
    seen: Mutex<Seen>,
    capacity: usize,
}

impl MemoryDedupStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            seen: Mutex::new(Seen::default()),
            capacity,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(0)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Seen> {
        self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryDedupStore {
    fn default() -> Self {
        Self::new(10_000)
    }
}

impl DedupStore for MemoryDedupStore {
    fn claim(&self, id: &str) -> bool {
        let mut seen = self.lock();
        if !seen.ids.insert(id.to_string()) {
            return false;
        }
        seen.order.push_back(id.to_string());

        if self.capacity > 0 {
            while seen.order.len() > self.capacity {
                if let Some(oldest) = seen.order.pop_front() {
                    seen.ids.remove(&oldest);
                }
            }
        }
        true
    }
}

//! 内存存储
//!
//! 使用 DashMap 实现的并发内存存储，保存按订单号预置的 accrual 结果。

use dashmap::DashMap;
use std::sync::Arc;

/// 按订单号索引的内存存储
///
/// clone 后共享同一份数据，便于测试代码与 HTTP 处理器同时访问。
#[derive(Debug)]
pub struct MemoryStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 插入或覆盖
    pub fn insert(&self, key: &str, value: T) {
        self.data.insert(key.to_string(), value);
    }

    /// 返回数据的克隆，不持有锁
    pub fn get(&self, key: &str) -> Option<T> {
        self.data.get(key).map(|v| v.clone())
    }

    pub fn remove(&self, key: &str) -> Option<T> {
        self.data.remove(key).map(|(_, v)| v)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn clear(&self) {
        self.data.clear();
    }
}

impl<T: Clone> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

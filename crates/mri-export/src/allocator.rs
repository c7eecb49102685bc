//! 代理键分配
//!
//! 检查、系列、影像各自独立计数，从1开始，按遍历顺序逐个递增，不复用。

use mri_core::EntityKind;
use std::sync::atomic::{AtomicU64, Ordering};

/// 代理键分配器
pub trait IdAllocator: Send + Sync {
    /// 为一个新实体分配下一个键
    fn next_id(&self, kind: EntityKind) -> u64;

    /// 已分配的键数量
    fn issued(&self, kind: EntityKind) -> u64;
}

/// 顺序分配器
///
/// 计数器是原子的，多个生产者共享同一个分配器时键仍然唯一。
#[derive(Debug, Default)]
pub struct SequentialAllocator {
    study: AtomicU64,
    series: AtomicU64,
    image: AtomicU64,
}

impl SequentialAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, kind: EntityKind) -> &AtomicU64 {
        match kind {
            EntityKind::Study => &self.study,
            EntityKind::Series => &self.series,
            EntityKind::Image => &self.image,
        }
    }
}

impl IdAllocator for SequentialAllocator {
    fn next_id(&self, kind: EntityKind) -> u64 {
        self.counter(kind).fetch_add(1, Ordering::SeqCst) + 1
    }

    fn issued(&self, kind: EntityKind) -> u64 {
        self.counter(kind).load(Ordering::SeqCst)
    }
}

//! 按表统计模块
//!
//! 每个 `(数据库, 表)` 键对应一个 [`TableStats`]，首次引用时惰性创建。
//! 时间使用规范化后的定宽字符串比较；位置只会扩大不会缩小。

use crate::binlog::types::{EventClass, ReplicationKey};
use serde::Serialize;
use std::collections::BTreeMap;

/// 单表统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub inserts: u64,
    pub updates: u64,
    pub deletes: u64,
    pub start_time: Option<String>,
    pub stop_time: Option<String>,
    /// `None` 表示尚未写入（无下界）
    pub start_pos: Option<u64>,
    pub stop_pos: u64,
}

impl TableStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 按类别累加计数
    pub fn record(&mut self, class: EventClass, count: u64) {
        match class {
            EventClass::Insert => self.inserts += count,
            EventClass::Update => self.updates += count,
            EventClass::Delete => self.deletes += count,
        }
    }

    /// 用当前时间扩大时间范围；当起始时间被提前时，起始位置取 `start_candidate` 与已有值的较小者
    pub fn observe(&mut self, time: Option<&str>, start_candidate: u64) {
        let Some(time) = time else {
            return;
        };

        if self.start_time.as_deref().is_none_or(|start| time < start) {
            self.start_time = Some(time.to_string());
            self.start_pos = Some(
                self.start_pos.map_or(start_candidate, |p| p.min(start_candidate)),
            );
        }

        if self.stop_time.as_deref().is_none_or(|stop| time > stop) {
            self.stop_time = Some(time.to_string());
        }
    }

    /// 扩大结束位置
    pub fn widen_stop_pos(&mut self, pos: u64) {
        self.stop_pos = self.stop_pos.max(pos);
    }

    /// 三类计数之和
    pub fn total(&self) -> u64 {
        self.inserts + self.updates + self.deletes
    }

    pub fn has_activity(&self) -> bool {
        self.total() > 0
    }
}

/// 所有键的统计表
#[derive(Debug, Default, Clone)]
pub struct StatsTable {
    buckets: BTreeMap<ReplicationKey, TableStats>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取（必要时创建）指定键的统计
    pub fn bucket_mut(&mut self, key: &ReplicationKey) -> &mut TableStats {
        self.buckets.entry(key.clone()).or_default()
    }

    pub fn get(&self, key: &ReplicationKey) -> Option<&TableStats> {
        self.buckets.get(key)
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ReplicationKey, &TableStats)> {
        self.buckets.iter()
    }

    /// 结束一次解析：丢弃从未记录到起始时间的统计，并补齐缺失的结束时间与起始位置
    pub fn finalize(&mut self) {
        self.buckets.retain(|key, stats| {
            if stats.start_time.is_none() {
                tracing::debug!(table = %key, "丢弃没有起始时间的统计");
                return false;
            }
            if stats.stop_time.is_none() {
                stats.stop_time = stats.start_time.clone();
            }
            if stats.start_pos.is_none() {
                stats.start_pos = Some(stats.stop_pos);
            }
            true
        });
    }

    /// 按起始时间升序排列（无时间的排在最后），并去掉没有任何变更的表
    pub fn active_rows(&self) -> Vec<(&ReplicationKey, &TableStats)> {
        let mut rows: Vec<_> =
            self.buckets.iter().filter(|(_, s)| s.has_activity()).collect();
        rows.sort_by(|(_, a), (_, b)| match (&a.start_time, &b.start_time) {
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });
        rows
    }
}

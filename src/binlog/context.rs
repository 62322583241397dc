//! 上下文跟踪 - 当前数据库/表/位置/时间，以及正在进行中的结构
//!
//! 解析过程中同一时刻最多只有一个打开的结构：空闲、行事件或语句。
//! 使用枚举表示，避免多个标志位之间出现不一致的组合。

use crate::binlog::rows::RowExtractor;
use crate::binlog::statement::StatementBuffer;
use crate::binlog::types::{ReplicationKey, RowEventKind};

/// 打开中的行事件
#[derive(Debug, Clone)]
pub struct OpenRowEvent {
    pub kind: RowEventKind,
    /// 通过过滤条件的目标键；`None` 表示该事件不参与统计和重建
    pub key: Option<ReplicationKey>,
    /// 事件之前 Table_map 所在的位置，作为起始位置候选
    pub start_pos: u64,
    /// 已计数的行数
    pub rows: u64,
    /// 事件头中的 `end_log_pos`
    pub end_pos: Option<u64>,
    /// 仅在提取模式下存在；行镜像段结束后置为 `None`
    pub extractor: Option<RowExtractor>,
}

impl OpenRowEvent {
    /// 记录一行：INSERT 按 `### SET`，UPDATE/DELETE 按 `### WHERE` 计数
    pub fn count_clause(&mut self, is_set: bool) {
        if self.key.is_some() && self.kind.counts_on_set() == is_set {
            self.rows += 1;
        }
    }
}

/// 当前打开的结构
#[derive(Debug, Clone, Default)]
pub enum Construct {
    #[default]
    Idle,
    RowEvent(OpenRowEvent),
    Statement(StatementBuffer),
}

/// 单次解析过程中的可变上下文
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub database: Option<String>,
    pub table: Option<String>,
    pub position: u64,
    pub timestamp: Option<String>,
    /// 最近一次 Table_map 建立的键
    pub key: Option<ReplicationKey>,
    /// 最近一次 Table_map 出现时的位置
    pub table_map_pos: u64,
    pub construct: Construct,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// `USE `db``
    pub fn use_database(&mut self, database: String) {
        self.database = Some(database);
    }

    /// Table_map：同时切换数据库与表，并记下映射时的位置
    pub fn map_table(&mut self, key: ReplicationKey) {
        self.database = Some(key.database.clone());
        self.table = Some(key.table.clone());
        self.key = Some(key);
        self.table_map_pos = self.position;
    }

    /// 取出当前结构并置为空闲
    pub fn take_construct(&mut self) -> Construct {
        std::mem::take(&mut self.construct)
    }

    pub fn row_event_mut(&mut self) -> Option<&mut OpenRowEvent> {
        match &mut self.construct {
            Construct::RowEvent(event) => Some(event),
            _ => None,
        }
    }

    pub fn statement_mut(&mut self) -> Option<&mut StatementBuffer> {
        match &mut self.construct {
            Construct::Statement(buffer) => Some(buffer),
            _ => None,
        }
    }

    pub fn in_row_event(&self) -> bool {
        matches!(self.construct, Construct::RowEvent(_))
    }
}

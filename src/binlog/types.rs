//! binlog 解析相关的核心类型

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::BinlogError;

/// 数据库缺失或无法解析时使用的占位名称
pub const UNKNOWN: &str = "unknown";

/// 统计与操作归属的 `(数据库, 表)` 键
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ReplicationKey {
    /// 数据库名
    pub database: String,
    /// 表名
    pub table: String,
}

impl ReplicationKey {
    pub fn new<D: Into<String>, T: Into<String>>(database: D, table: T) -> Self {
        Self { database: database.into(), table: table.into() }
    }

    /// 无法解析目标表时使用的 `(unknown, unknown)`
    pub fn unknown() -> Self {
        Self::new(UNKNOWN, UNKNOWN)
    }
}

impl fmt::Display for ReplicationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.table)
    }
}

/// 行事件类型（Write_rows / Update_rows / Delete_rows）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowEventKind {
    Insert,
    Update,
    Delete,
}

impl RowEventKind {
    /// 该类型行事件中每行对应的计数子句标记
    pub fn counts_on_set(self) -> bool {
        matches!(self, RowEventKind::Insert)
    }

    /// 对应的统计类别
    pub fn event_class(self) -> EventClass {
        match self {
            RowEventKind::Insert => EventClass::Insert,
            RowEventKind::Update => EventClass::Update,
            RowEventKind::Delete => EventClass::Delete,
        }
    }
}

/// 统计计数器类别，DDL 语句计入 `Update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventClass {
    Insert,
    Update,
    Delete,
}

/// 重建出的变更操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    Insert,
    Update,
    Delete,
}

/// 列序号（从 1 开始）到规范化字面量的映射
pub type ColumnValues = BTreeMap<u32, String>;

/// 由行事件重建出的一条变更
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    pub kind: OperationKind,
    pub database: String,
    pub table: String,
    /// DELETE 的各列取值，按输出顺序排列
    pub values: Vec<String>,
    /// UPDATE 的 WHERE 部分（变更前）
    pub before: ColumnValues,
    /// UPDATE 的 SET 部分（变更后）；INSERT 的 SET 部分
    pub after: ColumnValues,
}

impl Operation {
    pub fn new(kind: OperationKind, key: &ReplicationKey) -> Self {
        Self {
            kind,
            database: key.database.clone(),
            table: key.table.clone(),
            values: Vec::new(),
            before: ColumnValues::new(),
            after: ColumnValues::new(),
        }
    }

    pub fn key(&self) -> ReplicationKey {
        ReplicationKey::new(self.database.clone(), self.table.clone())
    }

    /// 是否为可用于生成回滚 SQL 的完整操作
    ///
    /// UPDATE 必须同时具有 WHERE 与 SET 两部分；DELETE 与 INSERT 至少捕获到一个值。
    pub fn is_usable(&self) -> bool {
        match self.kind {
            OperationKind::Delete => !self.values.is_empty(),
            OperationKind::Update => {
                !self.before.is_empty() && !self.after.is_empty()
            }
            OperationKind::Insert => !self.after.is_empty(),
        }
    }
}

/// 闪回模式：决定把哪类操作反转为回滚 SQL
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum FlashbackMode {
    /// DELETE 转 INSERT
    #[default]
    Deletes,
    /// UPDATE 反向
    Updates,
    /// INSERT 转 DELETE
    Inserts,
}

impl FlashbackMode {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashbackMode::Deletes => "deletes",
            FlashbackMode::Updates => "updates",
            FlashbackMode::Inserts => "inserts",
        }
    }

    /// 写入 SQL 文件头部的模式说明
    pub fn description(self) -> &'static str {
        match self {
            FlashbackMode::Deletes => "DELETE转INSERT恢复",
            FlashbackMode::Updates => "UPDATE反向恢复",
            FlashbackMode::Inserts => "INSERT转DELETE恢复",
        }
    }

    /// 该模式会反转的操作类型
    pub fn source_kind(self) -> OperationKind {
        match self {
            FlashbackMode::Deletes => OperationKind::Delete,
            FlashbackMode::Updates => OperationKind::Update,
            FlashbackMode::Inserts => OperationKind::Insert,
        }
    }
}

impl fmt::Display for FlashbackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FlashbackMode {
    type Err = BinlogError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "deletes" => Ok(FlashbackMode::Deletes),
            "updates" => Ok(FlashbackMode::Updates),
            "inserts" => Ok(FlashbackMode::Inserts),
            other => Err(BinlogError::config_error(format!(
                "无效的闪回模式: {other}"
            ))),
        }
    }
}

/// 数据库/表过滤条件，精确匹配；未设置的一侧视为全部接受
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFilter {
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub table: Option<String>,
}

impl KeyFilter {
    pub fn new(database: Option<String>, table: Option<String>) -> Self {
        Self { database, table }
    }

    pub fn accepts(&self, key: &ReplicationKey) -> bool {
        let db_match =
            self.database.as_deref().is_none_or(|db| db == key.database);
        let table_match =
            self.table.as_deref().is_none_or(|t| t == key.table);
        db_match && table_match
    }
}

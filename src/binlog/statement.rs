//! 语句事件提取器 - 多行 SQL 文本的拼接、目标表解析与分类

use crate::binlog::types::{EventClass, ReplicationKey, UNKNOWN};
use lazy_static::lazy_static;
use regex::Regex;

/// 语句结束符
pub const TERMINATOR: char = ';';

lazy_static! {
    static ref QUALIFIED_RE: Regex = Regex::new(
        r"(?:`([^`]+)`|\b([A-Za-z_]\w*))\.(?:`([^`]+)`|([A-Za-z_]\w*)\b)"
    )
    .unwrap();
    static ref TABLE_RE: Regex = Regex::new(
        r"(?i)\bTABLE\s+(?:IF\s+(?:NOT\s+)?EXISTS\s+)?`?(\w+)`?"
    )
    .unwrap();
    static ref DDL_RE: Regex =
        Regex::new(r"(?i)\b(?:CREATE|ALTER|DROP|TRUNCATE|RENAME)\b").unwrap();
    static ref INSERT_RE: Regex = Regex::new(r"(?i)\bINSERT\b").unwrap();
    static ref UPDATE_RE: Regex = Regex::new(r"(?i)\bUPDATE\b").unwrap();
    static ref DELETE_RE: Regex = Regex::new(r"(?i)\bDELETE\b").unwrap();
}

/// 正在拼接中的语句
#[derive(Debug, Clone, Default)]
pub struct StatementBuffer {
    text: String,
    end_pos: Option<u64>,
}

impl StatementBuffer {
    pub fn new(end_pos: Option<u64>) -> Self {
        Self { text: String::new(), end_pos }
    }

    /// 语句事件头中声明的结束位置
    pub fn end_pos(&self) -> Option<u64> {
        self.end_pos
    }

    /// 追加一行续行文本，返回该行是否包含结束符
    pub fn push_line(&mut self, line: &str) -> bool {
        self.text.push_str(line.trim());
        self.text.push(' ');
        line.contains(TERMINATOR)
    }

    /// 取出去除首尾空白的完整语句
    pub fn into_sql(self) -> String {
        self.text.trim().to_string()
    }
}

/// 已结束的语句事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatementEvent {
    pub sql: String,
    pub key: ReplicationKey,
    pub class: Option<EventClass>,
}

impl StatementEvent {
    pub fn from_sql(sql: String, current_database: Option<&str>) -> Self {
        let key = resolve_key(&sql, current_database);
        let class = classify_statement(&sql);
        Self { sql, key, class }
    }
}

/// 解析语句的目标表。
///
/// 顺序：语句中任意位置的 `db.table` 限定名（覆盖上下文）→ `TABLE <name>` 搭配当前数据库
/// （无则为 `unknown`）→ `(unknown, unknown)`。
#[must_use]
pub fn resolve_key(sql: &str, current_database: Option<&str>) -> ReplicationKey {
    if let Some(caps) = QUALIFIED_RE.captures(sql) {
        let database = caps.get(1).or_else(|| caps.get(2));
        let table = caps.get(3).or_else(|| caps.get(4));
        if let (Some(database), Some(table)) = (database, table) {
            return ReplicationKey::new(database.as_str(), table.as_str());
        }
    }

    if let Some(caps) = TABLE_RE.captures(sql) {
        let database = current_database.filter(|db| !db.is_empty()).unwrap_or(UNKNOWN);
        return ReplicationKey::new(database, &caps[1]);
    }

    ReplicationKey::unknown()
}

/// 按关键字对语句分类，优先级：DDL → INSERT → UPDATE → DELETE。
///
/// DDL 计入 update 类；都不匹配时返回 `None`，不参与统计。
#[must_use]
pub fn classify_statement(sql: &str) -> Option<EventClass> {
    if DDL_RE.is_match(sql) {
        Some(EventClass::Update)
    } else if INSERT_RE.is_match(sql) {
        Some(EventClass::Insert)
    } else if UPDATE_RE.is_match(sql) {
        Some(EventClass::Update)
    } else if DELETE_RE.is_match(sql) {
        Some(EventClass::Delete)
    } else {
        None
    }
}

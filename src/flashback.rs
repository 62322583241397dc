//! 闪回 SQL 生成
//!
//! 把重建出的操作按闪回模式反转为回滚语句：
//! - `deletes`：DELETE → `INSERT INTO ... VALUES (...)`，按捕获的列顺序
//! - `updates`：UPDATE → `UPDATE ... SET <变更前> WHERE <变更后>`
//! - `inserts`：INSERT → `DELETE FROM ... WHERE <插入值> LIMIT 1`
//!
//! 解码文本中没有列名，列统一命名为 `col_<序号>`。这是已知限制，不做表结构查询。

use crate::binlog::types::{ColumnValues, FlashbackMode, Operation, OperationKind};

/// 按输入顺序为匹配模式的操作生成回滚 SQL
#[must_use]
pub fn generate_rollback_sql(
    operations: &[Operation],
    mode: FlashbackMode,
) -> Vec<String> {
    let statements: Vec<String> = operations
        .iter()
        .filter(|op| op.kind == mode.source_kind())
        .filter_map(|op| match op.kind {
            OperationKind::Delete => Some(delete_to_insert(op)),
            OperationKind::Update => update_to_update(op),
            OperationKind::Insert => insert_to_delete(op),
        })
        .collect();

    tracing::debug!(mode = %mode, count = statements.len(), "生成回滚语句");
    statements
}

fn delete_to_insert(op: &Operation) -> String {
    format!(
        "INSERT INTO {} VALUES ({});",
        qualified_name(op),
        op.values.join(", ")
    )
}

fn update_to_update(op: &Operation) -> Option<String> {
    let ordinals: Vec<u32> = op
        .before
        .keys()
        .filter(|ordinal| op.after.contains_key(ordinal))
        .copied()
        .collect();
    if ordinals.is_empty() {
        return None;
    }

    let set_clause = ordinals
        .iter()
        .map(|n| format!("{} = {}", column_name(*n), op.before[n]))
        .collect::<Vec<_>>()
        .join(", ");
    let where_clause = where_clause(&op.after, &ordinals);

    Some(format!(
        "UPDATE {} SET {} WHERE {};",
        qualified_name(op),
        set_clause,
        where_clause
    ))
}

fn insert_to_delete(op: &Operation) -> Option<String> {
    if op.after.is_empty() {
        return None;
    }
    let ordinals: Vec<u32> = op.after.keys().copied().collect();
    Some(format!(
        "DELETE FROM {} WHERE {} LIMIT 1;",
        qualified_name(op),
        where_clause(&op.after, &ordinals)
    ))
}

fn where_clause(values: &ColumnValues, ordinals: &[u32]) -> String {
    ordinals
        .iter()
        .map(|n| {
            let value = &values[n];
            if value == "NULL" {
                format!("{} IS NULL", column_name(*n))
            } else {
                format!("{} = {}", column_name(*n), value)
            }
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn column_name(ordinal: u32) -> String {
    format!("`col_{ordinal}`")
}

fn qualified_name(op: &Operation) -> String {
    format!("{}.{}", quote_ident(&op.database), quote_ident(&op.table))
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}

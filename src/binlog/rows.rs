//! 行事件提取器 - 从 `###` 行镜像重建变更操作
//!
//! 只在需要完整重建（而非仅计数）时启用。一个行事件中可能包含多行镜像，
//! 每遇到行镜像头（`### DELETE FROM` 等），或在当前行已捕获值之后再次遇到
//! 计数子句（DELETE/UPDATE 的 `### WHERE`、INSERT 的 `### SET`），就开始一条新操作。

use crate::binlog::types::{Operation, OperationKind, ReplicationKey, RowEventKind};
use crate::binlog::utils::{normalize_field_value, strip_annotation};

/// 当前所在的行镜像子句
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Section {
    #[default]
    None,
    InWhere,
    InSet,
}

/// 单个行事件的操作重建状态
#[derive(Debug, Clone)]
pub struct RowExtractor {
    kind: RowEventKind,
    key: ReplicationKey,
    section: Section,
    current: Operation,
}

impl RowExtractor {
    pub fn new(kind: RowEventKind, key: ReplicationKey) -> Self {
        let current = Operation::new(operation_kind(kind), &key);
        Self { kind, key, section: Section::None, current }
    }

    /// 行镜像头：结束当前行并开始新的一行
    pub fn begin_row(&mut self, out: &mut Vec<Operation>) {
        let next = Operation::new(operation_kind(self.kind), &self.key);
        let done = std::mem::replace(&mut self.current, next);
        self.section = Section::None;
        emit(done, out);
    }

    /// `### WHERE`
    pub fn enter_where(&mut self, out: &mut Vec<Operation>) {
        let row_done = match self.kind {
            RowEventKind::Delete => !self.current.values.is_empty(),
            RowEventKind::Update => !self.current.after.is_empty(),
            RowEventKind::Insert => false,
        };
        if row_done {
            self.begin_row(out);
        }
        self.section = Section::InWhere;
    }

    /// `### SET`
    pub fn enter_set(&mut self, out: &mut Vec<Operation>) {
        if self.kind == RowEventKind::Insert && !self.current.after.is_empty() {
            self.begin_row(out);
        }
        self.section = Section::InSet;
    }

    /// `### @<n>=<value>`
    pub fn field(&mut self, ordinal: u32, raw: &str) {
        let value = normalize_field_value(strip_annotation(raw));
        tracing::trace!(ordinal, raw, value = %value, "字段值");

        match (self.kind, self.section) {
            (RowEventKind::Delete, _) => self.current.values.push(value),
            (RowEventKind::Insert, _) => {
                self.current.after.insert(ordinal, value);
            }
            (RowEventKind::Update, Section::InWhere) => {
                self.current.before.insert(ordinal, value);
            }
            (RowEventKind::Update, Section::InSet) => {
                self.current.after.insert(ordinal, value);
            }
            (RowEventKind::Update, Section::None) => {
                tracing::debug!(ordinal, "UPDATE 字段出现在 WHERE/SET 之前，已忽略");
            }
        }
    }

    /// 行镜像结束，输出最后一行
    pub fn finish(self, out: &mut Vec<Operation>) {
        emit(self.current, out);
    }
}

fn operation_kind(kind: RowEventKind) -> OperationKind {
    match kind {
        RowEventKind::Insert => OperationKind::Insert,
        RowEventKind::Update => OperationKind::Update,
        RowEventKind::Delete => OperationKind::Delete,
    }
}

fn emit(op: Operation, out: &mut Vec<Operation>) {
    if op.is_usable() {
        tracing::debug!(kind = ?op.kind, table = %op.key(), "重建操作");
        out.push(op);
    } else if !(op.values.is_empty() && op.before.is_empty() && op.after.is_empty())
    {
        tracing::debug!(
            kind = ?op.kind,
            table = %op.key(),
            before = op.before.len(),
            after = op.after.len(),
            "丢弃不完整的操作"
        );
    }
}

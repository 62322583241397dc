//! binlog 解码文本解析器 - 单次顺序扫描
//!
//! 解码后的文本自上而下只流过一次：行分类器识别出结构标记，驱动上下文跟踪，
//! 并分派给行事件提取器或语句提取器。两类事件都会无条件进入统计；
//! 只有在启用提取时，行事件才会被重建为 [`Operation`]。
//!
//! ## 解析流程
//!
//! ```text
//! 原始行 → classify_line() → 位置/时间/USE/Table_map → 上下文
//!                ↓
//!          行事件头 ────→ OpenRowEvent ── ### 行镜像 ──→ 计数 / RowExtractor
//!          Query 头 ────→ StatementBuffer ── 续行 ... ; ──→ StatementEvent
//!                ↓
//!          `# at N` 关闭行事件，把计数写入统计
//! ```
//!
//! 内容格式问题从不报错：不完整的标记被当作不匹配，不可用的操作被丢弃。
//! 只有输入为空时 [`parse_text`] / [`parse_reader`] 才会返回错误。

use crate::binlog::context::{Construct, Context, OpenRowEvent};
use crate::binlog::patterns::{LineMarker, classify_line, is_marker_line, is_row_image_line};
use crate::binlog::rows::RowExtractor;
use crate::binlog::statement::{StatementBuffer, StatementEvent};
use crate::binlog::types::{KeyFilter, Operation, RowEventKind};
use crate::binlog::utils::line_bytes_to_str;
use crate::error::{BinlogError, Result};
use crate::stats::StatsTable;
use std::io::BufRead;
use tracing::Span;

/// 解析选项
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// 数据库/表过滤，未通过的键既不统计也不重建
    pub filter: KeyFilter,
    /// 是否重建行事件操作
    pub extract: bool,
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, filter: KeyFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn extract(mut self, extract: bool) -> Self {
        self.extract = extract;
        self
    }
}

/// 一次解析的结果
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub stats: StatsTable,
    /// 按完成顺序排列的重建操作
    pub operations: Vec<Operation>,
    /// 处理的总行数
    pub lines: usize,
}

/// 单次解析的状态机
pub struct BinlogParser {
    options: ParseOptions,
    context: Context,
    stats: StatsTable,
    operations: Vec<Operation>,
    lines: usize,
    span: Span,
}

impl BinlogParser {
    pub fn new(options: ParseOptions) -> Self {
        Self {
            options,
            context: Context::new(),
            stats: StatsTable::new(),
            operations: Vec::new(),
            lines: 0,
            span: tracing::debug_span!("binlog_parse"),
        }
    }

    /// 指定诊断输出所在的 span
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// 当前上下文（只读）
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// 目前为止的统计（尚未结束的行事件计数未计入）
    pub fn stats(&self) -> &StatsTable {
        &self.stats
    }

    /// 目前为止完成的操作
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// 处理一行（已去除换行符）
    pub fn feed_line(&mut self, line: &str) {
        let span = self.span.clone();
        let _enter = span.enter();
        self.lines += 1;

        // 行镜像段在第一行非 `###` 行处结束，该行继续按常规分类
        if !is_row_image_line(line) {
            self.end_extraction();
        }

        let mut opened_statement = false;
        for marker in classify_line(line) {
            opened_statement |= matches!(marker, LineMarker::Query { .. });
            self.apply(marker);
        }

        self.observe_row_event();

        if !opened_statement {
            self.continue_statement(line);
        }
    }

    /// 结束解析：提交仍打开的行事件，丢弃未结束的语句，整理统计
    pub fn finish(mut self) -> ParseOutcome {
        let span = self.span.clone();
        let _enter = span.enter();

        match self.context.take_construct() {
            Construct::RowEvent(event) => self.commit_row_event(event, None),
            Construct::Statement(buffer) => {
                tracing::debug!(
                    sql = %buffer.into_sql(),
                    "输入结束时语句仍未结束，已丢弃"
                );
            }
            Construct::Idle => {}
        }

        self.stats.finalize();
        tracing::info!(
            lines = self.lines,
            tables = self.stats.len(),
            operations = self.operations.len(),
            "解析完成"
        );

        ParseOutcome {
            stats: self.stats,
            operations: self.operations,
            lines: self.lines,
        }
    }

    fn apply(&mut self, marker: LineMarker) {
        match marker {
            LineMarker::Position(pos) => {
                // 位置标记是上一个事件的边界，先关闭行事件再更新位置
                if self.context.in_row_event() {
                    if let Construct::RowEvent(event) = self.context.take_construct() {
                        self.commit_row_event(event, Some(pos));
                    }
                }
                self.context.position = pos;
            }
            LineMarker::Timestamp(time) => self.context.timestamp = Some(time),
            LineMarker::UseDatabase(db) => self.context.use_database(db),
            LineMarker::TableMap(key) => {
                tracing::trace!(table = %key, pos = self.context.position, "Table_map");
                self.context.map_table(key);
            }
            LineMarker::RowEvent { kind, end_pos } => {
                self.open_row_event(kind, end_pos);
            }
            LineMarker::RowImage(kind) => self.row_image(kind),
            LineMarker::WhereClause => self.clause(false),
            LineMarker::SetClause => self.clause(true),
            LineMarker::FieldValue { ordinal, raw } => {
                if let Some(extractor) = self
                    .context
                    .row_event_mut()
                    .and_then(|event| event.extractor.as_mut())
                {
                    extractor.field(ordinal, &raw);
                }
            }
            LineMarker::Query { end_pos } => self.open_statement(end_pos),
        }
    }

    fn open_row_event(&mut self, kind: RowEventKind, end_pos: Option<u64>) {
        self.close_construct();

        let key = self
            .context
            .key
            .clone()
            .filter(|key| self.options.filter.accepts(key));
        if key.is_none() {
            tracing::trace!(?kind, "行事件没有可用的目标表，跳过");
        }

        let extractor = if self.options.extract {
            key.clone().map(|key| RowExtractor::new(kind, key))
        } else {
            None
        };

        self.context.construct = Construct::RowEvent(OpenRowEvent {
            kind,
            key,
            start_pos: self.context.table_map_pos,
            rows: 0,
            end_pos,
            extractor,
        });
    }

    /// 行镜像头：同类行事件内是行边界，否则视为新行事件的开始
    fn row_image(&mut self, kind: RowEventKind) {
        let same_kind = matches!(
            &self.context.construct,
            Construct::RowEvent(event) if event.kind == kind
        );
        if !same_kind {
            self.open_row_event(kind, None);
            return;
        }
        if let Some(extractor) = self
            .context
            .row_event_mut()
            .and_then(|event| event.extractor.as_mut())
        {
            extractor.begin_row(&mut self.operations);
        }
    }

    fn clause(&mut self, is_set: bool) {
        let Some(event) = self.context.row_event_mut() else {
            return;
        };
        event.count_clause(is_set);
        if let Some(extractor) = event.extractor.as_mut() {
            if is_set {
                extractor.enter_set(&mut self.operations);
            } else {
                extractor.enter_where(&mut self.operations);
            }
        }
    }

    fn end_extraction(&mut self) {
        if let Some(extractor) = self
            .context
            .row_event_mut()
            .and_then(|event| event.extractor.take())
        {
            extractor.finish(&mut self.operations);
        }
    }

    fn observe_row_event(&mut self) {
        let Construct::RowEvent(event) = &self.context.construct else {
            return;
        };
        if let Some(key) = &event.key {
            self.stats
                .bucket_mut(key)
                .observe(self.context.timestamp.as_deref(), event.start_pos);
        }
    }

    /// 把行事件的计数写入统计；`boundary` 为关闭它的位置标记
    fn commit_row_event(&mut self, event: OpenRowEvent, boundary: Option<u64>) {
        if let Some(extractor) = event.extractor {
            extractor.finish(&mut self.operations);
        }
        let Some(key) = event.key else {
            return;
        };

        tracing::trace!(table = %key, kind = ?event.kind, rows = event.rows, "提交行事件");
        let stats = self.stats.bucket_mut(&key);
        stats.record(event.kind.event_class(), event.rows);
        if let Some(stop) = event.end_pos.or(boundary) {
            stats.widen_stop_pos(stop);
        }
    }

    fn open_statement(&mut self, end_pos: Option<u64>) {
        self.close_construct();
        self.context.construct = Construct::Statement(StatementBuffer::new(end_pos));
    }

    /// 打开新结构前关闭当前结构
    fn close_construct(&mut self) {
        match self.context.take_construct() {
            Construct::RowEvent(event) => self.commit_row_event(event, None),
            Construct::Statement(buffer) => {
                tracing::debug!(sql = %buffer.into_sql(), "语句未结束即被新事件取代，已丢弃");
            }
            Construct::Idle => {}
        }
    }

    fn continue_statement(&mut self, line: &str) {
        if is_marker_line(line) || line.trim().is_empty() {
            return;
        }
        let Some(buffer) = self.context.statement_mut() else {
            return;
        };
        if !buffer.push_line(line) {
            return;
        }

        if let Construct::Statement(buffer) = self.context.take_construct() {
            let end_pos = buffer.end_pos();
            let event = StatementEvent::from_sql(
                buffer.into_sql(),
                self.context.database.as_deref(),
            );
            self.record_statement(event, end_pos);
        }
    }

    fn record_statement(&mut self, event: StatementEvent, end_pos: Option<u64>) {
        if !self.options.filter.accepts(&event.key) {
            tracing::trace!(table = %event.key, "语句目标表未通过过滤");
            return;
        }
        let Some(class) = event.class else {
            tracing::trace!(sql = %event.sql, "语句不参与统计");
            return;
        };

        tracing::trace!(table = %event.key, ?class, sql = %event.sql, "语句事件");
        let position = self.context.position;
        let stats = self.stats.bucket_mut(&event.key);
        stats.record(class, 1);
        stats.observe(self.context.timestamp.as_deref(), position);
        stats.widen_stop_pos(end_pos.unwrap_or(position));
    }
}

/// 对完整文本执行一次解析
///
/// # Errors
/// 文本为空（或只有空白）时返回 [`BinlogError::EmptyInput`]。
pub fn parse_text(text: &str, options: ParseOptions) -> Result<ParseOutcome> {
    if text.trim().is_empty() {
        return Err(BinlogError::EmptyInput);
    }

    let mut parser = BinlogParser::new(options);
    for line in text.lines() {
        parser.feed_line(line);
    }
    Ok(parser.finish())
}

/// 逐行读取并解析，遇到无效 UTF-8 时按有损方式转换后继续
///
/// # Errors
/// 读取失败返回 [`BinlogError::Io`]；没有任何非空行时返回 [`BinlogError::EmptyInput`]。
pub fn parse_reader<R: BufRead>(
    mut reader: R,
    options: ParseOptions,
) -> Result<ParseOutcome> {
    let mut parser = BinlogParser::new(options);
    let mut buf = Vec::new();
    let mut has_content = false;
    let mut line_num = 0usize;

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        line_num += 1;
        let line = line_bytes_to_str(&buf, line_num);
        let line = line.trim_end_matches(['\r', '\n']);
        has_content |= !line.trim().is_empty();
        parser.feed_line(line);
    }

    if !has_content {
        return Err(BinlogError::EmptyInput);
    }
    Ok(parser.finish())
}

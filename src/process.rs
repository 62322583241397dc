//! 高层处理流程：获取解码文本 → 解析 → 统计报告 / 回滚 SQL
//!
//! 命令行的 `analyze` 和 `extract` 子命令都只是这里的薄封装。

use crate::binlog::parser::{ParseOptions, ParseOutcome, parse_text};
use crate::binlog::types::{FlashbackMode, KeyFilter, OperationKind};
use crate::decoder::{self, DecodeOptions};
use crate::error::Result;
use crate::flashback::generate_rollback_sql;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// 解码文本的来源
#[derive(Debug, Clone)]
pub enum BinlogSource {
    /// 原始 binlog，需要调用 mysqlbinlog 解码
    Binary {
        path: PathBuf,
        /// mysqlbinlog 可执行文件
        binary: String,
        options: DecodeOptions,
        /// 先把输出落盘再读取
        direct: bool,
    },
    /// 已经解码好的文本文件
    Decoded(PathBuf),
}

impl BinlogSource {
    /// 取得解码后的文本
    pub fn load(&self) -> Result<String> {
        match self {
            BinlogSource::Binary { path, binary, options, direct: false } => {
                decoder::decode_binlog(binary, path, options)
            }
            BinlogSource::Binary { path, binary, options, direct: true } => {
                decoder::decode_binlog_via_file(
                    binary,
                    path,
                    options,
                    &decoder::temp_decode_path(),
                )
            }
            BinlogSource::Decoded(path) => decoder::read_decoded(path),
        }
    }

    /// 报告中使用的 binlog 名称（文件名部分）
    pub fn label(&self) -> String {
        let path = match self {
            BinlogSource::Binary { path, .. } | BinlogSource::Decoded(path) => path,
        };
        file_label(path)
    }
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// 单个 binlog 的统计结果
#[derive(Debug, Clone)]
pub struct BinlogReport {
    pub label: String,
    pub outcome: ParseOutcome,
}

/// 回滚 SQL 提取结果
#[derive(Debug, Clone)]
pub struct Extraction {
    pub outcome: ParseOutcome,
    pub mode: FlashbackMode,
    pub statements: Vec<String>,
}

impl Extraction {
    /// 按操作类型统计重建出的操作数 (insert, update, delete)
    pub fn operation_counts(&self) -> (usize, usize, usize) {
        self.outcome.operations.iter().fold((0, 0, 0), |(i, u, d), op| {
            match op.kind {
                OperationKind::Insert => (i + 1, u, d),
                OperationKind::Update => (i, u + 1, d),
                OperationKind::Delete => (i, u, d + 1),
            }
        })
    }
}

/// 对解码文本做统计分析
pub fn analyze_text(text: &str, filter: KeyFilter) -> Result<ParseOutcome> {
    parse_text(text, ParseOptions::new().filter(filter))
}

/// 分析单个来源
pub fn analyze_source(source: &BinlogSource, filter: KeyFilter) -> Result<BinlogReport> {
    let label = source.label();
    let start = Instant::now();
    let text = source.load()?;
    let outcome = analyze_text(&text, filter)?;
    tracing::info!(
        binlog = %label,
        tables = outcome.stats.len(),
        elapsed = ?start.elapsed(),
        "binlog 分析完成"
    );
    Ok(BinlogReport { label, outcome })
}

/// 依次分析多个来源，任一失败即返回错误
pub fn analyze_binlogs(
    sources: &[BinlogSource],
    filter: &KeyFilter,
) -> Result<Vec<BinlogReport>> {
    sources
        .iter()
        .map(|source| analyze_source(source, filter.clone()))
        .collect()
}

/// 从解码文本中重建操作并生成回滚 SQL
pub fn extract_sql_from_text(
    text: &str,
    filter: KeyFilter,
    mode: FlashbackMode,
) -> Result<Extraction> {
    let outcome = parse_text(text, ParseOptions::new().filter(filter).extract(true))?;
    let statements = generate_rollback_sql(&outcome.operations, mode);
    let extraction = Extraction { outcome, mode, statements };

    let (inserts, updates, deletes) = extraction.operation_counts();
    tracing::info!(inserts, updates, deletes, "找到 {} 个操作", extraction.outcome.operations.len());
    tracing::info!(mode = %mode, "生成 {} 条SQL语句", extraction.statements.len());
    Ok(extraction)
}

/// 从来源提取回滚 SQL
pub fn extract_sql(
    source: &BinlogSource,
    filter: KeyFilter,
    mode: FlashbackMode,
) -> Result<Extraction> {
    tracing::info!(
        binlog = %source.label(),
        database = ?filter.database,
        table = ?filter.table,
        mode = %mode,
        "提取参数"
    );
    let text = source.load()?;
    extract_sql_from_text(&text, filter, mode)
}

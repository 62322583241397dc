//! 统计报告与 SQL 文件输出
//!
//! 统计报告为定宽列文本，每个 `(数据库, 表)` 一行，按起始时间升序；
//! 回滚 SQL 文件带有注释头，写明生成时间、恢复模式和语句数量。

use crate::binlog::types::FlashbackMode;
use crate::error::Result;
use crate::stats::{StatsTable, TableStats};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn format_row(cells: [&str; 10]) -> String {
    let [binlog, start, stop, start_pos, stop_pos, ins, upd, del, db, table] =
        cells;
    format!(
        "{binlog:<20} {start:<20} {stop:<20} {start_pos:<12} {stop_pos:<12} {ins:<8} {upd:<8} {del:<8} {db:<20} {table:<30}"
    )
    .trim_end()
    .to_string()
}

/// 报告表头
pub fn report_header() -> String {
    format_row([
        "binlog", "starttime", "stoptime", "startpos", "stoppos", "inserts",
        "updates", "deletes", "database", "table",
    ])
}

fn stats_row(label: &str, database: &str, table: &str, stats: &TableStats) -> String {
    let start_pos = stats.start_pos.unwrap_or(stats.stop_pos).to_string();
    let stop_pos = stats.stop_pos.to_string();
    let inserts = stats.inserts.to_string();
    let updates = stats.updates.to_string();
    let deletes = stats.deletes.to_string();
    format_row([
        label,
        stats.start_time.as_deref().unwrap_or_default(),
        stats.stop_time.as_deref().unwrap_or_default(),
        &start_pos,
        &stop_pos,
        &inserts,
        &updates,
        &deletes,
        database,
        table,
    ])
}

/// 报告数据行（不含表头），跳过没有任何变更的表
pub fn format_stats_rows(stats: &StatsTable, binlog_label: &str) -> Vec<String> {
    stats
        .active_rows()
        .into_iter()
        .map(|(key, s)| stats_row(binlog_label, &key.database, &key.table, s))
        .collect()
}

/// 单个 binlog 的完整报告
pub fn format_stats_report(stats: &StatsTable, binlog_label: &str) -> String {
    format_reports(std::iter::once((binlog_label, stats)))
}

/// 多个 binlog 共用一个表头的报告
pub fn format_reports<'a, I>(reports: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a StatsTable)>,
{
    let mut out = report_header();
    out.push('\n');
    for (label, stats) in reports {
        for row in format_stats_rows(stats, label) {
            out.push_str(&row);
            out.push('\n');
        }
    }
    out
}

/// 写入统计报告文件
pub fn write_stats_report<P: AsRef<Path>>(
    path: P,
    stats: &StatsTable,
    binlog_label: &str,
) -> Result<()> {
    write_report_text(path, &format_stats_report(stats, binlog_label))
}

/// 写入已经格式化好的报告文本
pub fn write_report_text<P: AsRef<Path>>(path: P, report: &str) -> Result<()> {
    let path = path.as_ref();
    std::fs::write(path, report)?;
    tracing::info!(path = %path.display(), "统计报告已生成");
    Ok(())
}

/// SQL 文件头部注释
pub fn sql_file_header(statement_count: usize, mode: FlashbackMode) -> String {
    let generated = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
    format!(
        "-- Binlog数据恢复SQL\n\
         -- 生成时间: {generated}\n\
         -- 恢复模式: {}\n\
         -- 共 {statement_count} 条SQL语句\n\
         -- 请确认SQL正确性后再执行！\n\
         -- 建议先备份数据\n\n",
        mode.description()
    )
}

/// 写入回滚 SQL 文件，每行一条语句
pub fn write_sql_file<P: AsRef<Path>>(
    path: P,
    statements: &[String],
    mode: FlashbackMode,
) -> Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(sql_file_header(statements.len(), mode).as_bytes())?;
    for sql in statements {
        writeln!(writer, "{sql}")?;
    }
    writer.flush()?;

    tracing::info!(
        path = %path.display(),
        count = statements.len(),
        "SQL已保存"
    );
    Ok(())
}

/// 把统计结果序列化为 JSON 数组，顺序与文本报告一致
#[cfg(feature = "export-json")]
pub fn stats_to_json(stats: &StatsTable, binlog_label: &str) -> Result<String> {
    let rows: Vec<_> = stats
        .active_rows()
        .into_iter()
        .map(|(key, s)| {
            serde_json::json!({
                "binlog": binlog_label,
                "database": key.database,
                "table": key.table,
                "stats": s,
            })
        })
        .collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

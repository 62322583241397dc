//! 行分类器 - binlog 解码文本的结构标记识别
//!
//! `mysqlbinlog --base64-output=decode-rows -v` 的输出并不是正式语法，而是约定格式的诊断转储。
//! 所有标记识别都集中在 [`RECOGNIZERS`] 这一张表里，格式有变化时只需修改这里。
//!
//! ```text
//! # at 219                                                        → Position
//! #201012 10:00:00 server id 1  end_log_pos 300 ... Table_map: `shop`.`orders` mapped to number 108
//!                                                                 → Timestamp + TableMap
//! #201012 10:00:00 server id 1  end_log_pos 360 ... Delete_rows: table id 108 flags: STMT_END_F
//!                                                                 → Timestamp + RowEvent
//! ### DELETE FROM `shop`.`orders`                                 → RowImage
//! ### WHERE                                                       → WhereClause
//! ###   @1=5                                                      → FieldValue
//! ```
//!
//! 同一行可能匹配多个标记，按表中顺序全部返回，由解析器依次应用。

use crate::binlog::types::{ReplicationKey, RowEventKind};
use crate::binlog::utils::normalize_timestamp;
use lazy_static::lazy_static;
use regex::Regex;

/// 单行识别出的结构标记及其捕获内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineMarker {
    /// `# at <n>`：事件边界位置
    Position(u64),
    /// `#YYMMDD HH:MM:SS`：规范化后的时间戳
    Timestamp(String),
    /// ``USE `db` ``
    UseDatabase(String),
    /// ``Table_map: `db`.`table` ``
    TableMap(ReplicationKey),
    /// `Write_rows` / `Update_rows` / `Delete_rows` 事件头
    RowEvent { kind: RowEventKind, end_pos: Option<u64> },
    /// `### INSERT INTO` / `### UPDATE` / `### DELETE FROM` 行镜像头
    RowImage(RowEventKind),
    /// `### WHERE`
    WhereClause,
    /// `### SET`
    SetClause,
    /// `### @<n>=<value>`，值保持原始文本
    FieldValue { ordinal: u32, raw: String },
    /// `Query ... thread_id=` 语句事件头
    Query { end_pos: Option<u64> },
}

type Recognizer = fn(&str) -> Option<LineMarker>;

/// 识别器适用的行类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineScope {
    /// 只作用于 `###` 以外的行（事件头、SQL 文本）
    Header,
    /// 只作用于 `###` 行镜像内容行
    RowImage,
}

/// 标记识别表，顺序即同一行内各标记的应用顺序。
///
/// `###` 行上只识别行镜像头、子句和字段值，字段值里出现的
/// `Delete_rows`、`Query ... thread_id`、`at 5` 等文本不会被当成结构标记。
pub const RECOGNIZERS: &[(&str, LineScope, Recognizer)] = &[
    ("position", LineScope::Header, recognize_position),
    ("timestamp", LineScope::Header, recognize_timestamp),
    ("use", LineScope::Header, recognize_use),
    ("table_map", LineScope::Header, recognize_table_map),
    ("row_event", LineScope::Header, recognize_row_event),
    ("row_image", LineScope::RowImage, recognize_row_image),
    ("where", LineScope::RowImage, recognize_where),
    ("set", LineScope::RowImage, recognize_set),
    ("field", LineScope::RowImage, recognize_field),
    ("query", LineScope::Header, recognize_query),
];

lazy_static! {
    static ref POSITION_RE: Regex = Regex::new(r"\bat (\d+)").unwrap();
    static ref TIMESTAMP_RE: Regex =
        Regex::new(r"^#(\d{6})\s+(\d{1,2}):(\d{2}):(\d{2})").unwrap();
    static ref USE_RE: Regex = Regex::new(r"(?i)\bUSE `([^`]+)`").unwrap();
    static ref TABLE_MAP_RE: Regex =
        Regex::new(r"(?i)Table_map: `([^`]+)`\.`([^`]+)`").unwrap();
    static ref END_POS_RE: Regex = Regex::new(r"end_log_pos (\d+)").unwrap();
    static ref FIELD_RE: Regex = Regex::new(r"^###\s+@(\d+)=(.*)$").unwrap();
}

/// 行镜像前缀
pub const ROW_IMAGE_PREFIX: &str = "###";

/// 对单行文本（已去除换行）进行分类，返回所有匹配的标记
#[must_use]
pub fn classify_line(line: &str) -> Vec<LineMarker> {
    let scope = if is_row_image_line(line) {
        LineScope::RowImage
    } else {
        LineScope::Header
    };

    RECOGNIZERS
        .iter()
        .filter(|(_, applies_to, _)| *applies_to == scope)
        .filter_map(|(name, _, recognize)| {
            let marker = recognize(line);
            if marker.is_some() {
                tracing::trace!(marker = name, "识别到标记: {}", line);
            }
            marker
        })
        .collect()
}

/// 是否为 `###` 开头的行镜像内容行
#[must_use]
pub fn is_row_image_line(line: &str) -> bool {
    line.trim_start().starts_with(ROW_IMAGE_PREFIX)
}

/// 是否为 `#` 开头的注释/头部行
#[must_use]
pub fn is_marker_line(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn recognize_position(line: &str) -> Option<LineMarker> {
    let caps = POSITION_RE.captures(line)?;
    caps[1].parse().ok().map(LineMarker::Position)
}

fn recognize_timestamp(line: &str) -> Option<LineMarker> {
    let caps = TIMESTAMP_RE.captures(line)?;
    normalize_timestamp(&caps[1], &caps[2], &caps[3], &caps[4])
        .map(LineMarker::Timestamp)
}

fn recognize_use(line: &str) -> Option<LineMarker> {
    USE_RE
        .captures(line)
        .map(|caps| LineMarker::UseDatabase(caps[1].to_string()))
}

fn recognize_table_map(line: &str) -> Option<LineMarker> {
    TABLE_MAP_RE.captures(line).map(|caps| {
        LineMarker::TableMap(ReplicationKey::new(&caps[1], &caps[2]))
    })
}

fn recognize_row_event(line: &str) -> Option<LineMarker> {
    let kind = if line.contains("Write_rows") {
        RowEventKind::Insert
    } else if line.contains("Update_rows") {
        RowEventKind::Update
    } else if line.contains("Delete_rows") {
        RowEventKind::Delete
    } else {
        return None;
    };
    Some(LineMarker::RowEvent { kind, end_pos: end_position(line) })
}

fn recognize_row_image(line: &str) -> Option<LineMarker> {
    let rest = line.trim_start().strip_prefix(ROW_IMAGE_PREFIX)?.trim_start();
    let kind = if rest.starts_with("INSERT INTO") {
        RowEventKind::Insert
    } else if rest.starts_with("DELETE FROM") {
        RowEventKind::Delete
    } else if rest == "UPDATE" || rest.starts_with("UPDATE ") {
        RowEventKind::Update
    } else {
        return None;
    };
    Some(LineMarker::RowImage(kind))
}

// 计数和提取共用同一个子句标记，两者都要求整行（去除首尾空白后）恰好等于子句头
fn recognize_where(line: &str) -> Option<LineMarker> {
    (line.trim() == "### WHERE").then_some(LineMarker::WhereClause)
}

fn recognize_set(line: &str) -> Option<LineMarker> {
    (line.trim() == "### SET").then_some(LineMarker::SetClause)
}

fn recognize_field(line: &str) -> Option<LineMarker> {
    let caps = FIELD_RE.captures(line.trim())?;
    let ordinal = caps[1].parse().ok()?;
    Some(LineMarker::FieldValue { ordinal, raw: caps[2].to_string() })
}

fn recognize_query(line: &str) -> Option<LineMarker> {
    (line.contains("Query") && line.contains("thread_id"))
        .then(|| LineMarker::Query { end_pos: end_position(line) })
}

fn end_position(line: &str) -> Option<u64> {
    END_POS_RE.captures(line).and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_marker() {
        assert_eq!(classify_line("# at 219"), vec![LineMarker::Position(219)]);
        assert!(classify_line("###   @2='meet at 5'")
            .iter()
            .all(|m| !matches!(m, LineMarker::Position(_))));
    }

    #[test]
    fn test_marker_text_inside_field_value() {
        for value in [
            "'see Query thread_id=1'",
            "'Delete_rows log'",
            "'Write_rows Update_rows'",
            "'x ### WHERE y'",
            "'### SET'",
            "'USE `other`'",
            "'Table_map: `a`.`b`'",
        ] {
            let line = format!("###   @2={value}");
            assert_eq!(
                classify_line(&line),
                vec![LineMarker::FieldValue { ordinal: 2, raw: value.to_string() }],
                "{line}"
            );
        }
    }

    #[test]
    fn test_clause_requires_whole_line() {
        assert_eq!(classify_line("  ### WHERE  "), vec![LineMarker::WhereClause]);
        assert!(classify_line("### WHERE x").is_empty());
        assert!(classify_line("### SETTINGS").is_empty());
    }

    #[test]
    fn test_table_map_header_line() {
        let line = "#201012 10:00:00 server id 1  end_log_pos 300 CRC32 0x3a2b1c0d \tTable_map: `shop`.`orders` mapped to number 108";
        let markers = classify_line(line);
        assert_eq!(
            markers,
            vec![
                LineMarker::Timestamp("2020-10-12_10:00:00".to_string()),
                LineMarker::TableMap(ReplicationKey::new("shop", "orders")),
            ]
        );
    }

    #[test]
    fn test_table_map_missing_backtick_is_ignored() {
        let markers = classify_line("# Table_map: `shop`.orders mapped");
        assert!(markers.is_empty());
    }

    #[test]
    fn test_row_event_header() {
        let line = "#201012 10:00:00 server id 1  end_log_pos 460 CRC32 0x1 \tDelete_rows: table id 108 flags: STMT_END_F";
        let markers = classify_line(line);
        assert!(markers.contains(&LineMarker::RowEvent {
            kind: RowEventKind::Delete,
            end_pos: Some(460)
        }));
    }

    #[test]
    fn test_row_image_lines() {
        assert_eq!(
            classify_line("### UPDATE `shop`.`orders`"),
            vec![LineMarker::RowImage(RowEventKind::Update)]
        );
        assert_eq!(classify_line("### WHERE"), vec![LineMarker::WhereClause]);
        assert_eq!(classify_line("### SET"), vec![LineMarker::SetClause]);
        assert_eq!(
            classify_line("###   @3='x' /* VARSTRING(20) meta=20 */"),
            vec![LineMarker::FieldValue {
                ordinal: 3,
                raw: "'x' /* VARSTRING(20) meta=20 */".to_string()
            }]
        );
    }

    #[test]
    fn test_query_and_use() {
        let markers = classify_line(
            "#201012 10:00:00 server id 1  end_log_pos 520 CRC32 0x1 \tQuery\tthread_id=7\texec_time=0\terror_code=0",
        );
        assert!(
            markers.contains(&LineMarker::Query { end_pos: Some(520) })
        );
        assert_eq!(
            classify_line("use `shop`/*!*/;"),
            vec![LineMarker::UseDatabase("shop".to_string())]
        );
    }

    #[test]
    fn test_timestamp_with_padded_hour() {
        assert_eq!(
            classify_line("#201012  9:05:01 server id 1"),
            vec![LineMarker::Timestamp("2020-10-12_09:05:01".to_string())]
        );
        assert!(classify_line("#201399 10:00:00 server id 1").is_empty());
    }
}

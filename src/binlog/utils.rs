//! binlog 文本解析的工具函数

use chrono::NaiveDateTime;
use std::{borrow::Cow, str};

/// 规范化后的时间戳格式，定宽且可按字典序比较
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H:%M:%S";

/// 将行事件中的字段原始值转换为 SQL 字面量。
///
/// 规则（按顺序）：
/// - `NULL` 原样返回
/// - 单引号包裹：内部单引号加倍后重新以单引号包裹
/// - 双引号包裹：同上，但统一改用单引号包裹
/// - 其他（数字、十六进制等）原样返回
///
/// 不了解列类型，纯文本处理。
#[must_use]
pub fn normalize_field_value(raw: &str) -> String {
    let value = raw.trim();

    if value == "NULL" {
        return value.to_string();
    }

    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote)
        {
            let inner = &value[1..value.len() - 1];
            return format!("'{}'", inner.replace('\'', "''"));
        }
    }

    value.to_string()
}

/// 去除值尾部的 `/* ... */` 注释（`-vv` 输出的列类型说明）
#[must_use]
pub fn strip_annotation(raw: &str) -> &str {
    let value = raw.trim();
    if value.ends_with("*/") {
        if let Some(start) = value.rfind("/*") {
            return value[..start].trim_end();
        }
    }
    value
}

/// 将 `#YYMMDD HH:MM:SS` 头部中捕获到的日期和时间规范化为 `YYYY-MM-DD_HH:MM:SS`。
///
/// 小时允许为空格补齐的一位数字。日期不合法时返回 `None`。
#[must_use]
pub fn normalize_timestamp(
    date: &str,
    hour: &str,
    minute: &str,
    second: &str,
) -> Option<String> {
    let raw = format!("20{date} {hour:0>2}:{minute}:{second}");
    NaiveDateTime::parse_from_str(&raw, "%Y%m%d %H:%M:%S")
        .ok()
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
}

/// 将读取到的字节转换为字符串（尽可能为 Borrowed），遇到无效 UTF-8 时有损转换。
///
/// 行为说明：
/// - 字节序列是有效的 UTF-8 时返回 `Cow::Borrowed(&str)`，避免额外分配。
/// - 否则记录一条警告（只含长度和最多 8 字节前缀，避免日志膨胀），
///   并返回替换了无效序列的 owned `String`。
pub fn line_bytes_to_str(line_bytes: &[u8], line_num: usize) -> Cow<'_, str> {
    match str::from_utf8(line_bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(e) => {
            let prefix = &line_bytes[..8usize.min(line_bytes.len())];
            tracing::warn!(
                line = line_num,
                len = line_bytes.len(),
                prefix = ?prefix,
                error = %e,
                "发现无效 UTF-8 字节序列，按有损方式转换"
            );
            Cow::Owned(String::from_utf8_lossy(line_bytes).into_owned())
        }
    }
}

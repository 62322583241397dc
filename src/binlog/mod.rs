//! binlog 解码文本解析模块
//!
//! 提供行分类、上下文跟踪、行事件/语句事件提取以及单次扫描解析器

pub mod context;
pub mod parser;
pub mod patterns;
pub mod rows;
pub mod statement;
pub mod types;
pub mod utils;

// 重新导出核心类型和函数
pub use parser::{BinlogParser, ParseOptions, ParseOutcome, parse_reader, parse_text};
pub use patterns::{LineMarker, classify_line};
pub use types::{
    EventClass, FlashbackMode, KeyFilter, Operation, OperationKind,
    ReplicationKey, RowEventKind,
};
pub use utils::normalize_field_value;

//! # binlog-analysis
//!
//! MySQL binlog 解码文本分析库：按表统计变更、重建行级操作并生成闪回 SQL。
//!
//! ## 主要功能
//!
//! - **单次扫描解析**：[`binlog::BinlogParser`] 顺序消费 mysqlbinlog 的解码输出
//! - **按表统计**：插入/更新/删除计数、时间范围与位置范围
//! - **闪回 SQL**：DELETE → INSERT、UPDATE 反向、INSERT → DELETE
//! - **报告输出**：定宽统计报告与带注释头的 SQL 文件
//!
//! ## 快速开始
//!
//! ```rust
//! use binlog_analysis::binlog::{ParseOptions, parse_text};
//! use binlog_analysis::flashback::generate_rollback_sql;
//! use binlog_analysis::FlashbackMode;
//!
//! let text = [
//!     "#201012 10:00:00 server id 1 \tTable_map: `shop`.`orders` mapped to number 1",
//!     "#201012 10:00:00 server id 1 \tDelete_rows: table id 1",
//!     "### DELETE FROM `shop`.`orders`",
//!     "### WHERE",
//!     "###   @1=5",
//!     "# at 200",
//! ]
//! .join("\n");
//!
//! let outcome = parse_text(&text, ParseOptions::new().extract(true)).unwrap();
//! let sql = generate_rollback_sql(&outcome.operations, FlashbackMode::Deletes);
//! assert_eq!(sql, vec!["INSERT INTO `shop`.`orders` VALUES (5);"]);
//! ```

pub mod binlog;
pub mod config;
pub mod decoder;
pub mod error;
pub mod flashback;
pub mod process;
pub mod report;
pub mod stats;

#[cfg(feature = "logging")]
pub mod logging;

pub use binlog::{
    BinlogParser, FlashbackMode, KeyFilter, Operation, OperationKind,
    ParseOptions, ParseOutcome, ReplicationKey,
};
pub use config::Config;
pub use error::{BinlogError, Result};
pub use stats::{StatsTable, TableStats};

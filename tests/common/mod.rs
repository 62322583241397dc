//! 集成测试公共模块

use binlog_analysis::binlog::{ParseOptions, ParseOutcome, parse_text};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// 把解码文本写入临时目录
#[allow(dead_code)]
pub fn create_decoded_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let file_path = dir.path().join(filename);
    fs::write(&file_path, content).expect("Failed to write test file");
    file_path
}

/// 解析并启用提取
#[allow(dead_code)]
pub fn parse_extract(text: &str) -> ParseOutcome {
    parse_text(text, ParseOptions::new().extract(true)).expect("parse failed")
}

/// 典型的 `mysqlbinlog --base64-output=decode-rows -v` 输出：
/// 两行 DELETE、一行 UPDATE、一行 INSERT，以及一条 ALTER 语句
#[allow(dead_code)]
pub const SAMPLE_DECODED: &str = r#"# The proper term is pseudo_replica_mode, but we use this compatibility alias
/*!50530 SET @@SESSION.PSEUDO_SLAVE_MODE=1*/;
DELIMITER /*!*/;
# at 4
#201012 10:00:00 server id 1  end_log_pos 125 CRC32 0x5e8e2c37 	Start: binlog v 4, server v 8.0.21 created 201012 10:00:00 at startup
# at 100
#201012 10:00:01 server id 1  end_log_pos 160 CRC32 0x1a2b3c4d 	Table_map: `shop`.`orders` mapped to number 108
# at 160
#201012 10:00:01 server id 1  end_log_pos 230 CRC32 0x2b3c4d5e 	Delete_rows: table id 108 flags: STMT_END_F
### DELETE FROM `shop`.`orders`
### WHERE
###   @1=5
###   @2='book'
###   @3=NULL
### DELETE FROM `shop`.`orders`
### WHERE
###   @1=6
###   @2="O'Brien"
###   @3=12.5
# at 230
#201012 10:05:00 server id 1  end_log_pos 290 CRC32 0x3c4d5e6f 	Table_map: `shop`.`customers` mapped to number 109
# at 290
#201012 10:05:00 server id 1  end_log_pos 380 CRC32 0x4d5e6f70 	Update_rows: table id 109 flags: STMT_END_F
### UPDATE `shop`.`customers`
### WHERE
###   @1=1
###   @2='alice'
### SET
###   @1=1
###   @2='alicia'
# at 380
#201012 10:06:00 server id 1  end_log_pos 440 CRC32 0x5e6f7081 	Table_map: `crm`.`leads` mapped to number 110
# at 440
#201012 10:06:00 server id 1  end_log_pos 500 CRC32 0x6f708192 	Write_rows: table id 110 flags: STMT_END_F
### INSERT INTO `crm`.`leads`
### SET
###   @1=77
###   @2='new lead'
# at 500
#201012 10:07:00 server id 1  end_log_pos 620 CRC32 0x708192a3 	Query	thread_id=8	exec_time=0	error_code=0
ALTER TABLE `shop`.`orders` ADD COLUMN note INT;
# at 620
#201012 10:07:00 server id 1  end_log_pos 651 CRC32 0x8192a3b4 	Xid = 42
COMMIT/*!*/;
DELIMITER ;
# End of log file
"#;

/// 只有 WHERE 没有 SET 的 UPDATE 行事件
#[allow(dead_code)]
pub const UPDATE_WHERE_ONLY: &str = r#"# at 100
#201012 11:00:00 server id 1  end_log_pos 160 	Table_map: `shop`.`orders` mapped to number 108
# at 160
#201012 11:00:00 server id 1  end_log_pos 230 	Update_rows: table id 108 flags: STMT_END_F
### UPDATE `shop`.`orders`
### WHERE
###   @1=5
# at 230
"#;

//! 解析器集成测试：统计聚合、过滤与操作重建

mod common;

use binlog_analysis::FlashbackMode;
use binlog_analysis::binlog::{
    BinlogParser, KeyFilter, OperationKind, ParseOptions, ReplicationKey, parse_text,
};
use binlog_analysis::flashback::generate_rollback_sql;
use common::{SAMPLE_DECODED, UPDATE_WHERE_ONLY, parse_extract};

fn key(db: &str, table: &str) -> ReplicationKey {
    ReplicationKey::new(db, table)
}

#[test]
fn test_sample_stats() {
    let outcome = parse_text(SAMPLE_DECODED, ParseOptions::new()).unwrap();
    let stats = &outcome.stats;
    assert_eq!(stats.len(), 3);

    let orders = stats.get(&key("shop", "orders")).unwrap();
    assert_eq!((orders.inserts, orders.updates, orders.deletes), (0, 1, 2));
    assert_eq!(orders.start_pos, Some(100));
    assert_eq!(orders.stop_pos, 620);
    assert_eq!(orders.start_time.as_deref(), Some("2020-10-12_10:00:01"));
    assert_eq!(orders.stop_time.as_deref(), Some("2020-10-12_10:07:00"));

    let customers = stats.get(&key("shop", "customers")).unwrap();
    assert_eq!((customers.inserts, customers.updates, customers.deletes), (0, 1, 0));
    assert_eq!(customers.start_pos, Some(230));
    assert_eq!(customers.stop_pos, 380);

    let leads = stats.get(&key("crm", "leads")).unwrap();
    assert_eq!((leads.inserts, leads.updates, leads.deletes), (1, 0, 0));
    assert_eq!(leads.start_pos, Some(380));
    assert_eq!(leads.stop_pos, 500);

    assert!(outcome.operations.is_empty());
}

#[test]
fn test_end_to_end_single_delete() {
    let text = "\
#201012 10:00:00 server id 1  end_log_pos 4 \tStart: binlog v 4
# at 100
#201012 10:00:00 server id 1 \tTable_map: `shop`.`orders` mapped to number 108
#201012 10:00:00 server id 1 \tDelete_rows: table id 108 flags: STMT_END_F
### WHERE
###   @1=5
# at 200
";
    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    assert_eq!(outcome.stats.len(), 1);

    let orders = outcome.stats.get(&key("shop", "orders")).unwrap();
    assert_eq!(orders.deletes, 1);
    assert_eq!(orders.start_pos, Some(100));
    assert_eq!(orders.stop_pos, 200);
    assert_eq!(orders.start_time.as_deref(), Some("2020-10-12_10:00:00"));
    assert_eq!(orders.stop_time, orders.start_time);
}

#[test]
fn test_delete_round_trip_values() {
    let outcome = parse_extract(SAMPLE_DECODED);
    let deletes: Vec<_> = outcome
        .operations
        .iter()
        .filter(|op| op.kind == OperationKind::Delete)
        .collect();

    assert_eq!(deletes.len(), 2);
    assert_eq!(deletes[0].values, vec!["5", "'book'", "NULL"]);
    assert_eq!(deletes[1].values, vec!["6", "'O''Brien'", "12.5"]);
    assert_eq!(deletes[0].key(), key("shop", "orders"));
}

#[test]
fn test_update_and_insert_reconstruction() {
    let outcome = parse_extract(SAMPLE_DECODED);
    let kinds: Vec<_> = outcome.operations.iter().map(|op| op.kind).collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Delete,
            OperationKind::Delete,
            OperationKind::Update,
            OperationKind::Insert,
        ]
    );

    let update = &outcome.operations[2];
    assert_eq!(update.before.get(&2).map(String::as_str), Some("'alice'"));
    assert_eq!(update.after.get(&2).map(String::as_str), Some("'alicia'"));

    let insert = &outcome.operations[3];
    assert_eq!(insert.after.get(&1).map(String::as_str), Some("77"));
    assert_eq!(insert.key(), key("crm", "leads"));
}

#[test]
fn test_update_where_only_yields_no_operation() {
    let outcome = parse_extract(UPDATE_WHERE_ONLY);
    assert!(outcome.operations.is_empty());

    // 计数不受影响
    let orders = outcome.stats.get(&key("shop", "orders")).unwrap();
    assert_eq!(orders.updates, 1);
}

#[test]
fn test_database_filter_suppresses_other_buckets() {
    let filter = KeyFilter::new(Some("shop".to_string()), None);
    let outcome =
        parse_text(SAMPLE_DECODED, ParseOptions::new().filter(filter).extract(true))
            .unwrap();

    assert!(outcome.stats.get(&key("crm", "leads")).is_none());
    assert!(outcome.operations.iter().all(|op| op.database == "shop"));
    assert_eq!(outcome.stats.len(), 2);
}

#[test]
fn test_table_filter() {
    let filter = KeyFilter::new(Some("shop".to_string()), Some("customers".to_string()));
    let outcome = parse_text(SAMPLE_DECODED, ParseOptions::new().filter(filter)).unwrap();

    assert_eq!(outcome.stats.len(), 1);
    assert!(outcome.stats.get(&key("shop", "customers")).is_some());
}

#[test]
fn test_alter_statement_counts_as_update() {
    let text = "\
# at 500
#201012 10:07:00 server id 1  end_log_pos 620 \tQuery\tthread_id=8\texec_time=0\terror_code=0
ALTER TABLE `db`.`t` ADD COLUMN x INT;
";
    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    let t = outcome.stats.get(&key("db", "t")).unwrap();
    assert_eq!((t.inserts, t.updates, t.deletes), (0, 1, 0));
    assert_eq!(t.start_pos, Some(500));
    assert_eq!(t.stop_pos, 620);
}

#[test]
fn test_statement_uses_current_database() {
    let text = "\
#201012 10:07:00 server id 1  end_log_pos 300 \tQuery\tthread_id=8\texec_time=0
use `shop`/*!*/;
#201012 10:08:00 server id 1  end_log_pos 400 \tQuery\tthread_id=8\texec_time=0
TRUNCATE TABLE orders;
";
    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    let orders = outcome.stats.get(&key("shop", "orders")).unwrap();
    assert_eq!(orders.updates, 1);
    assert_eq!(orders.stop_pos, 400);
}

#[test]
fn test_multiline_statement() {
    let text = "\
#201012 10:07:00 server id 1  end_log_pos 300 \tQuery\tthread_id=8\texec_time=0
INSERT INTO shop.orders (id, note)
VALUES (1, 'x');
";
    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    assert_eq!(outcome.stats.get(&key("shop", "orders")).unwrap().inserts, 1);
}

#[test]
fn test_stop_pos_and_stop_time_are_monotonic() {
    let mut parser = BinlogParser::new(ParseOptions::new());
    let orders = key("shop", "orders");
    let mut last: Option<(u64, Option<String>)> = None;

    for line in SAMPLE_DECODED.lines() {
        parser.feed_line(line);
        if let Some(stats) = parser.stats().get(&orders) {
            let current = (stats.stop_pos, stats.stop_time.clone());
            if let Some((pos, time)) = &last {
                assert!(current.0 >= *pos);
                assert!(current.1 >= *time);
            }
            last = Some(current);
        }
    }
    assert!(last.is_some());
}

#[test]
fn test_malformed_lines_are_ignored() {
    let text = "\
# at 100
#201012 10:00:00 server id 1 \tTable_map: `shop.orders mapped to number 108
#201399 10:00:00 server id 1 \tsomething odd
###   @x=1
# at 200
";
    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    assert!(outcome.stats.is_empty());
    assert_eq!(outcome.lines, 5);
}

#[test]
fn test_marker_text_in_field_value_keeps_row_intact() {
    for value in [
        "'plain'",
        "'see Query thread_id=1'",
        "'Delete_rows log'",
        "'x ### WHERE y'",
        "'### SET'",
        "'meet at 5'",
    ] {
        let text = format!(
            "\
# at 100
#201012 10:00:00 server id 1  end_log_pos 160 \tTable_map: `shop`.`orders` mapped to number 108
# at 160
#201012 10:00:00 server id 1  end_log_pos 300 \tDelete_rows: table id 108 flags: STMT_END_F
### DELETE FROM `shop`.`orders`
### WHERE
###   @1=5
###   @2={value}
###   @3=7
# at 300
"
        );
        let outcome = parse_extract(&text);

        let orders = outcome.stats.get(&key("shop", "orders")).unwrap();
        assert_eq!(orders.deletes, 1, "value {value}");
        assert_eq!(outcome.stats.len(), 1, "value {value}");

        let sql = generate_rollback_sql(&outcome.operations, FlashbackMode::Deletes);
        assert_eq!(
            sql,
            vec![format!("INSERT INTO `shop`.`orders` VALUES (5, {value}, 7);")],
            "value {value}"
        );
    }
}

#[test]
fn test_row_event_open_at_end_of_stream() {
    let text = "\
# at 100
#201012 10:00:00 server id 1 \tTable_map: `shop`.`orders` mapped to number 108
#201012 10:00:00 server id 1 \tDelete_rows: table id 108 flags: STMT_END_F
### DELETE FROM `shop`.`orders`
### WHERE
###   @1=5";

    let outcome = parse_text(text, ParseOptions::new()).unwrap();
    assert_eq!(outcome.stats.get(&key("shop", "orders")).unwrap().deletes, 1);

    let outcome = parse_extract(text);
    assert_eq!(outcome.stats.get(&key("shop", "orders")).unwrap().deletes, 1);
    assert_eq!(outcome.operations.len(), 1);
    assert_eq!(outcome.operations[0].kind, OperationKind::Delete);
    assert_eq!(outcome.operations[0].values, vec!["5"]);
}

#[test]
fn test_database_filter_suppresses_statement() {
    let text = "\
# at 500
#201012 10:07:00 server id 1  end_log_pos 620 \tQuery\tthread_id=8\texec_time=0\terror_code=0
ALTER TABLE other.t ADD COLUMN x INT;
";
    let unfiltered = parse_text(text, ParseOptions::new()).unwrap();
    assert_eq!(unfiltered.stats.get(&key("other", "t")).unwrap().updates, 1);

    let filter = KeyFilter::new(Some("shop".to_string()), None);
    let outcome = parse_text(text, ParseOptions::new().filter(filter)).unwrap();
    assert!(outcome.stats.get(&key("other", "t")).is_none());
    assert!(outcome.stats.is_empty());
}

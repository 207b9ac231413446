// End-to-end checks: dump text -> TableSet -> JSON -> compaction -> SQLite.

use rusqlite::Connection;
use serde_json::json;
use sqldumpjson::config::Config;
use sqldumpjson::dump::DumpText;
use sqldumpjson::parser::{decode_statement, lex_scalar, locate_statements, tokenize_rows};
use sqldumpjson::report;
use sqldumpjson::store::SqliteWriter;
use sqldumpjson::{parse_dump, project_types, ParseOptions, ScalarValue, ScanIssue, TableSet};

const DUMP: &str = r#"-- MySQL dump
CREATE TABLE `games` (`id` char(36), `name` varchar(255), `class_name` varchar(64), `meta` json);
INSERT INTO `games` (`id`, `name`, `class_name`, `meta`, `created_at`) VALUES
('g1','Counter-Strike','fps','{"tags":["tactical","5v5"],"year":2000}','2024-01-01 00:00:00'),
('g2','Dota (2)','moba',NULL,'2024-01-02 00:00:00');
INSERT INTO `players` (`id`, `nick`, `image`, `settings`) VALUES
('p1','O\'Malley','https://x/p1.png','{"dpi":800,"sens":1.5,"binds":{"jump":"space; wheel"}}'),
('p2','semi;colon','https://x/p2.png','[1,2,'),
('p3','too','many','values','here');
INSERT INTO `game_player` (`id`, `game_id`, `player_id`, `active`) VALUES (1,'g1','p1',1),(2,'g1','p2',0),(3,'g2','p1',1);
INSERT INTO `broken` (`a`) SELECT 1;
INSERT INTO `games` (`id`, `name`, `class_name`, `meta`, `created_at`) VALUES ('g3','Quake','fps','[]',NULL);
"#;

fn parse(text: &str) -> sqldumpjson::ParsedDump {
    parse_dump(text, &ParseOptions::default(), None).unwrap()
}

#[test]
fn simple_insert_yields_typed_rows() {
    let stmts: Vec<_> = locate_statements("INSERT INTO t (a,b) VALUES (1,'x'),(2,NULL);")
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(stmts.len(), 1);
    assert_eq!(stmts[0].table_name, "t");
    assert_eq!(stmts[0].columns, vec!["a", "b"]);

    let rows: Vec<Vec<ScalarValue>> = tokenize_rows(&stmts[0].raw_values_text)
        .map(|r| r.unwrap().fields.iter().map(|f| lex_scalar(f)).collect())
        .collect();
    assert_eq!(
        rows,
        vec![
            vec![ScalarValue::Integer(1), ScalarValue::Text("x".into())],
            vec![ScalarValue::Integer(2), ScalarValue::Null],
        ]
    );
}

#[test]
fn semicolon_in_string_stays_in_one_statement() {
    let parsed = parse("INSERT INTO t (a) VALUES ('a;b');");
    let t = parsed.tables.get("t").unwrap();
    assert_eq!(t.len(), 1);
    assert_eq!(t[0]["a"], ScalarValue::Text("a;b".into()));
}

#[test]
fn mismatched_row_is_dropped_but_later_rows_survive() {
    let stmt = locate_statements("INSERT INTO t (a,b) VALUES (1,2,3),(4,5);")
        .next()
        .unwrap()
        .unwrap();
    let outcome = decode_statement(&stmt);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0]["b"], ScalarValue::Integer(5));
    assert_eq!(
        outcome.diagnostics.issues,
        vec![ScanIssue::RowFieldCountMismatch {
            table: "t".into(),
            expected: 2,
            actual: 3
        }]
    );
}

#[test]
fn statement_without_terminator_does_not_swallow_the_next() {
    let parsed = parse("INSERT INTO t (a) VALUES (1)\nINSERT INTO u (a) VALUES (2);");
    assert!(parsed.tables.get("t").is_none());
    let u = parsed.tables.get("u").unwrap();
    assert_eq!(u.len(), 1);
    assert_eq!(u[0]["a"], ScalarValue::Integer(2));
    assert_eq!(parsed.diagnostics.dropped_statements(), 1);
}

#[test]
fn realistic_dump_decodes_every_statement() {
    let parsed = parse(DUMP);
    let names: Vec<&str> = parsed.tables.table_names().collect();
    assert_eq!(names, vec!["games", "players", "game_player"]);

    let games = parsed.tables.get("games").unwrap();
    let ids: Vec<&str> = games.iter().filter_map(|g| g["id"].as_text()).collect();
    assert_eq!(ids, vec!["g1", "g2", "g3"]);
    assert_eq!(
        games[0]["meta"],
        ScalarValue::Structured(json!({"tags": ["tactical", "5v5"], "year": 2000}))
    );
    assert_eq!(games[1]["name"], ScalarValue::Text("Dota (2)".into()));
    assert_eq!(games[2]["meta"], ScalarValue::Structured(json!([])));

    let players = parsed.tables.get("players").unwrap();
    assert_eq!(players.len(), 2);
    assert_eq!(players[0]["nick"], ScalarValue::Text("O'Malley".into()));
    assert_eq!(
        players[0]["settings"],
        ScalarValue::Structured(json!({"dpi": 800, "sens": 1.5, "binds": {"jump": "space; wheel"}}))
    );
    assert_eq!(players[1]["settings"], ScalarValue::Text("[1,2,".into()));

    let d = &parsed.diagnostics;
    assert_eq!(d.statements, 4);
    assert_eq!(d.structured_fallbacks, 1);
    assert_eq!(d.mismatches(), 1);
    assert_eq!(d.dropped_statements(), 1);
}

#[test]
fn projection_is_stable_on_parsed_tables() {
    let parsed = parse(DUMP);
    for (_, records) in parsed.tables.iter() {
        assert_eq!(project_types(records), project_types(records));
    }
    let gp = project_types(parsed.tables.get("game_player").unwrap());
    assert_eq!(gp.get("active"), Some(sqldumpjson::ColumnType::Integer));
}

#[test]
fn counts_agree_between_dump_and_json_except_dropped_rows() {
    let parsed = parse(DUMP);
    let json = parsed.tables.to_json(true).unwrap();
    let reloaded = TableSet::from_json_str(&json).unwrap();
    assert_eq!(reloaded.total_records(), parsed.tables.total_records());

    let diffs = report::compare_counts(
        &report::count_rows(DUMP, 50),
        &report::table_counts(&reloaded),
    );
    let mismatched: Vec<&str> = diffs
        .iter()
        .filter(|d| !d.matches())
        .map(|d| d.table.as_str())
        .collect();
    assert_eq!(mismatched, vec!["players"]);

    let groups = report::group_counts(reloaded.get("game_player").unwrap(), "game_id");
    assert_eq!(groups, vec![("g1".to_string(), 2), ("g2".to_string(), 1)]);
}

#[test]
fn full_pipeline_from_file_to_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let dump_path = dir.path().join("dump.sql");
    std::fs::write(&dump_path, DUMP).unwrap();

    let dump = DumpText::open(&dump_path).unwrap();
    let parsed = parse_dump(dump.as_str(), &ParseOptions::default(), None).unwrap();
    drop(dump);

    let config = Config::default();
    let compacted = config.compactor().compact(parsed.tables);
    let json_path = dir.path().join("data.json");
    std::fs::write(&json_path, compacted.to_json(false).unwrap()).unwrap();

    let tables = TableSet::from_json_str(&std::fs::read_to_string(&json_path).unwrap()).unwrap();
    let games = tables.get("games").unwrap();
    let keys: Vec<&str> = games[0].keys().map(|k| k.as_str()).collect();
    assert_eq!(keys, vec!["id", "name", "cls", "meta"]);
    let players = tables.get("players").unwrap();
    assert!(players[0].contains_key("img"));

    let db_path = dir.path().join("mirror.db");
    let projector = config.projector();
    let writer = SqliteWriter::new(&projector, &config.index_columns);
    let summary = writer.write(&db_path, &tables, None).unwrap();
    assert_eq!(summary.tables.get("games"), Some(&3));
    assert_eq!(summary.tables.get("players"), Some(&2));
    assert_eq!(summary.tables.get("game_player"), Some(&3));
    assert_eq!(
        summary.indexes,
        vec!["idx_game_player_gid", "idx_game_player_pid"]
    );

    let conn = Connection::open(&db_path).unwrap();
    let game_cols: Vec<String> = conn
        .prepare("SELECT name FROM pragma_table_info('games')")
        .unwrap()
        .query_map([], |r| r.get(0))
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(game_cols, vec!["id", "name", "meta"]);

    let settings: String = conn
        .query_row("SELECT settings FROM players WHERE id = 'p1'", [], |r| r.get(0))
        .unwrap();
    let settings: serde_json::Value = serde_json::from_str(&settings).unwrap();
    assert_eq!(settings["binds"]["jump"], json!("space; wheel"));

    let per_game: i64 = conn
        .query_row("SELECT COUNT(*) FROM game_player WHERE gid = 'g1'", [], |r| r.get(0))
        .unwrap();
    assert_eq!(per_game, 2);

    // Writing again replaces the file rather than failing on existing tables.
    let again = writer.write(&db_path, &tables, None).unwrap();
    assert_eq!(again.tables.get("games"), Some(&3));
}

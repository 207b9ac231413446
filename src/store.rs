// SQLite mirror: one table per TableSet entry, columns typed by the projector,
// one row per record, plus secondary indexes on configured reference columns.

use crate::logger;
use crate::parser::TableSet;
use crate::project::{ColumnTypeInfo, StoredValue, TypeProjector};
use indexmap::IndexMap;
use rusqlite::types::{ToSqlOutput, Value as SqlValue};
use rusqlite::{params_from_iter, Connection, ToSql};
use std::path::Path;
use std::time::Instant;

impl ToSql for StoredValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            StoredValue::Null => ToSqlOutput::Owned(SqlValue::Null),
            StoredValue::Integer(i) => ToSqlOutput::Owned(SqlValue::Integer(*i)),
            StoredValue::Real(f) => ToSqlOutput::Owned(SqlValue::Real(*f)),
            StoredValue::Text(s) => ToSqlOutput::Borrowed(s.as_str().into()),
        })
    }
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StoreSummary {
    // Table -> row count read back after commit.
    pub tables: IndexMap<String, u64>,
    pub indexes: Vec<String>,
}

pub struct SqliteWriter<'a> {
    projector: &'a TypeProjector,
    index_columns: &'a [String],
}

impl<'a> SqliteWriter<'a> {
    pub fn new(projector: &'a TypeProjector, index_columns: &'a [String]) -> Self {
        Self {
            projector,
            index_columns,
        }
    }

    // Replace any existing file at `path` and write every non-empty table.
    pub fn write(
        &self,
        path: &Path,
        tables: &TableSet,
        bar: Option<&indicatif::ProgressBar>,
    ) -> Result<StoreSummary, Box<dyn std::error::Error + Send + Sync>> {
        let start = Instant::now();
        if path.exists() {
            logger::debug(&format!("Store: removing existing {}", path.display()));
            std::fs::remove_file(path)?;
        }
        let mut conn = Connection::open(path)?;
        let summary = self.write_to(&mut conn, tables, bar)?;
        conn.close().map_err(|(_, e)| e)?;
        logger::debug(&format!("Timing: store took {:?}", start.elapsed()));
        Ok(summary)
    }

    pub fn write_to(
        &self,
        conn: &mut Connection,
        tables: &TableSet,
        bar: Option<&indicatif::ProgressBar>,
    ) -> Result<StoreSummary, Box<dyn std::error::Error + Send + Sync>> {
        let mut summary = StoreSummary::default();
        let tx = conn.transaction()?;

        for (table, records) in tables.iter() {
            if let Some(b) = bar {
                b.inc(1);
            }
            if records.is_empty() {
                logger::debug(&format!("Store: skip empty table {}", table));
                continue;
            }
            let types = self.projector.project_types(table, records);
            if types.is_empty() {
                logger::debug(&format!("Store: skip table {} with no columns", table));
                continue;
            }

            tx.execute(&create_table_sql(table, &types), [])?;
            logger::debug(&format!("Store: created {} with {} columns", table, types.len()));

            {
                let mut stmt = tx.prepare(&insert_sql(table, &types))?;
                for record in records {
                    let row = self.projector.project_record(&types, record);
                    stmt.execute(params_from_iter(row.iter()))?;
                }
            }
            logger::debug(&format!("Store: inserted {} rows into {}", records.len(), table));

            for column in types.column_names() {
                if !self.index_columns.iter().any(|c| c == column) {
                    continue;
                }
                let name = format!("idx_{}_{}", table, column);
                tx.execute(
                    &format!(
                        "CREATE INDEX IF NOT EXISTS {} ON {}({})",
                        quote_ident(&name),
                        quote_ident(table),
                        quote_ident(column)
                    ),
                    [],
                )?;
                summary.indexes.push(name);
            }
        }
        tx.commit()?;

        for table in tables.table_names() {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
                [table],
                |row| row.get(0),
            )?;
            if !exists {
                continue;
            }
            let count: i64 = conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", quote_ident(table)),
                [],
                |row| row.get(0),
            )?;
            summary.tables.insert(table.to_string(), count.max(0) as u64);
        }
        if let Some(b) = bar {
            b.finish();
        }
        Ok(summary)
    }
}

// Identifiers are double-quoted so dump names that collide with keywords still work.
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_table_sql(table: &str, types: &ColumnTypeInfo) -> String {
    let cols: Vec<String> = types
        .iter()
        .map(|(col, ty)| {
            let pk = if col == "id" { " PRIMARY KEY" } else { "" };
            format!("  {} {}{}", quote_ident(col), ty.sql_name(), pk)
        })
        .collect();
    format!("CREATE TABLE {} (\n{}\n)", quote_ident(table), cols.join(",\n"))
}

fn insert_sql(table: &str, types: &ColumnTypeInfo) -> String {
    let cols: Vec<String> = types.column_names().map(quote_ident).collect();
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{}", i)).collect();
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote_ident(table),
        cols.join(", "),
        placeholders.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Record, ScalarValue};
    use serde_json::json;

    fn record(pairs: Vec<(&str, ScalarValue)>) -> Record {
        pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn tables() -> TableSet {
        let mut set = TableSet::new();
        set.extend_table(
            "games",
            vec![
                record(vec![
                    ("id", ScalarValue::Text("g1".into())),
                    ("name", ScalarValue::Text("Chess".into())),
                    ("cls", ScalarValue::Text("legacy".into())),
                    ("meta", ScalarValue::Structured(json!({"tags": ["a"]}))),
                ]),
                record(vec![
                    ("id", ScalarValue::Text("g2".into())),
                    ("name", ScalarValue::Text("Go".into())),
                    ("cls", ScalarValue::Null),
                    ("meta", ScalarValue::Null),
                ]),
            ],
        );
        set.extend_table(
            "game_player",
            vec![record(vec![
                ("id", ScalarValue::Integer(1)),
                ("gid", ScalarValue::Text("g1".into())),
                ("pid", ScalarValue::Text("p1".into())),
                ("active", ScalarValue::Structured(json!(true))),
            ])],
        );
        set.extend_table("empty", Vec::new());
        set
    }

    #[test]
    fn writes_typed_tables_and_indexes() {
        let projector = TypeProjector::new().exclude("games", "cls");
        let index_columns = vec!["gid".to_string(), "pid".to_string(), "tid".to_string()];
        let writer = SqliteWriter::new(&projector, &index_columns);
        let mut conn = Connection::open_in_memory().unwrap();

        let summary = writer.write_to(&mut conn, &tables(), None).unwrap();
        assert_eq!(summary.tables.get("games"), Some(&2));
        assert_eq!(summary.tables.get("game_player"), Some(&1));
        assert!(!summary.tables.contains_key("empty"));
        assert_eq!(summary.indexes, vec!["idx_game_player_gid", "idx_game_player_pid"]);

        let cols: Vec<String> = conn
            .prepare("SELECT name FROM pragma_table_info('games')")
            .unwrap()
            .query_map([], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(cols, vec!["id", "name", "meta"]);

        let meta: String = conn
            .query_row("SELECT meta FROM games WHERE id = 'g1'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(meta, r#"{"tags":["a"]}"#);
        let active: i64 = conn
            .query_row("SELECT active FROM game_player", [], |r| r.get(0))
            .unwrap();
        assert_eq!(active, 1);
    }

    #[test]
    fn duplicate_primary_key_fails_the_write() {
        let mut set = TableSet::new();
        set.extend_table(
            "t",
            vec![
                record(vec![("id", ScalarValue::Integer(1))]),
                record(vec![("id", ScalarValue::Integer(1))]),
            ],
        );
        let projector = TypeProjector::new();
        let writer = SqliteWriter::new(&projector, &[]);
        let mut conn = Connection::open_in_memory().unwrap();
        assert!(writer.write_to(&mut conn, &set, None).is_err());
    }

    #[test]
    fn sql_text_quotes_identifiers() {
        let types = crate::project::project_types(&[record(vec![
            ("id", ScalarValue::Integer(1)),
            ("order", ScalarValue::Real(0.5)),
        ])]);
        assert_eq!(
            create_table_sql("t", &types),
            "CREATE TABLE \"t\" (\n  \"id\" INTEGER PRIMARY KEY,\n  \"order\" REAL\n)"
        );
        assert_eq!(
            insert_sql("t", &types),
            "INSERT INTO \"t\" (\"id\", \"order\") VALUES (?1, ?2)"
        );
    }
}

// Acceptance reports: recount records from the dump or from a TableSet and diff them.
// Dump counts reuse the shared locator and row tokenizer, never a second scanner.

use crate::parser::{tokenize_rows, Record, StatementLocator, TableSet};
use indexmap::IndexMap;
use std::cmp::Reverse;

// Per-table tuple counts straight from dump text (no lexing, no column check).
pub fn count_rows(text: &str, values_lookahead: usize) -> IndexMap<String, usize> {
    let mut counts: IndexMap<String, usize> = IndexMap::new();
    for stmt in StatementLocator::new(text)
        .with_lookahead(values_lookahead)
        .filter_map(Result::ok)
    {
        let rows = tokenize_rows(&stmt.raw_values_text)
            .take_while(|r| r.is_ok())
            .count();
        *counts.entry(stmt.table_name).or_insert(0) += rows;
    }
    counts
}

pub fn table_counts(tables: &TableSet) -> IndexMap<String, usize> {
    tables
        .iter()
        .map(|(name, records)| (name.clone(), records.len()))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CountDiff {
    pub table: String,
    pub sql: usize,
    pub json: usize,
}

impl CountDiff {
    pub fn matches(&self) -> bool {
        self.sql == self.json
    }
}

// One row per table present on either side, sorted by table name.
pub fn compare_counts(
    sql: &IndexMap<String, usize>,
    json: &IndexMap<String, usize>,
) -> Vec<CountDiff> {
    let mut names: Vec<&String> = sql.keys().chain(json.keys()).collect();
    names.sort();
    names.dedup();
    names
        .into_iter()
        .map(|name| CountDiff {
            table: name.clone(),
            sql: sql.get(name).copied().unwrap_or(0),
            json: json.get(name).copied().unwrap_or(0),
        })
        .collect()
}

// Records per distinct value of `column`, largest group first, then by key.
pub fn group_counts(records: &[Record], column: &str) -> Vec<(String, usize)> {
    let mut groups: IndexMap<String, usize> = IndexMap::new();
    for record in records {
        if let Some(value) = record.get(column) {
            *groups.entry(value.display_key()).or_insert(0) += 1;
        }
    }
    let mut out: Vec<(String, usize)> = groups.into_iter().collect();
    out.sort_by(|a, b| (Reverse(a.1), &a.0).cmp(&(Reverse(b.1), &b.0)));
    out
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize)]
pub struct SizeDelta {
    pub before: u64,
    pub after: u64,
}

impl SizeDelta {
    pub fn saved(&self) -> i64 {
        self.before as i64 - self.after as i64
    }

    // Percentage saved relative to `before`; 0 when there was nothing to shrink.
    pub fn reduction_pct(&self) -> f64 {
        if self.before == 0 {
            return 0.0;
        }
        self.saved() as f64 / self.before as f64 * 100.0
    }
}

pub fn mib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

// Dump pipeline: locate statements sequentially, decode them in parallel,
// then merge records per table in statement-encounter order.

use crate::error::Diagnostics;
use crate::logger;
use crate::parser::{decode_statement, StatementLocator, StatementOutcome, TableSet};
use rayon::prelude::*;
use std::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    // Rayon threads for statement decoding (0 = number of CPUs).
    pub workers: usize,
    pub values_lookahead: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            workers: 0,
            values_lookahead: crate::parser::DEFAULT_VALUES_LOOKAHEAD,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParsedDump {
    pub tables: TableSet,
    pub diagnostics: Diagnostics,
}

// Parse a whole dump held in memory. Never fails: malformed statements and
// mismatched rows become diagnostics, and an empty dump yields an empty TableSet.
pub fn parse_dump(
    text: &str,
    options: &ParseOptions,
    bar: Option<&indicatif::ProgressBar>,
) -> Result<ParsedDump, Box<dyn std::error::Error + Send + Sync>> {
    let start = Instant::now();
    let mut diagnostics = Diagnostics::default();

    let mut statements = Vec::new();
    let mut locator = StatementLocator::new(text).with_lookahead(options.values_lookahead);
    let mut last_pos = 0usize;
    while let Some(item) = locator.next() {
        match item {
            Ok(stmt) => statements.push(stmt),
            Err(issue) => {
                logger::debug(&format!("ParseDump: {}", issue));
                diagnostics.push(issue);
            }
        }
        if let Some(b) = bar {
            let pos = locator.position().min(text.len());
            b.inc((pos - last_pos) as u64);
            last_pos = pos;
        }
    }
    if let Some(b) = bar {
        b.finish();
    }
    logger::debug(&format!(
        "ParseDump: located {} statements in {:?}",
        statements.len(),
        start.elapsed()
    ));

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(options.workers)
        .build()?;
    // Indexed collect keeps statement order regardless of completion order.
    let outcomes: Vec<StatementOutcome> =
        pool.install(|| statements.par_iter().map(decode_statement).collect());

    let mut tables = TableSet::new();
    for outcome in outcomes {
        tables.extend_table(&outcome.table, outcome.records);
        diagnostics.merge(outcome.diagnostics);
    }

    for (name, records) in tables.iter() {
        logger::debug(&format!("ParseDump: table {} has {} records", name, records.len()));
    }
    logger::debug(&format!("Timing: parse took {:?}", start.elapsed()));

    Ok(ParsedDump {
        tables,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ScalarValue;

    fn parse(text: &str) -> ParsedDump {
        parse_dump(text, &ParseOptions::default(), None).unwrap()
    }

    #[test]
    fn statements_for_one_table_concatenate_in_order() {
        let dump = "INSERT INTO t (a) VALUES (1),(2);\n\
                    INSERT INTO u (b) VALUES ('x');\n\
                    INSERT INTO t (a) VALUES (3);\n";
        let parsed = parse(dump);
        let t: Vec<&ScalarValue> = parsed.tables.get("t").unwrap().iter().map(|r| &r["a"]).collect();
        assert_eq!(
            t,
            vec![
                &ScalarValue::Integer(1),
                &ScalarValue::Integer(2),
                &ScalarValue::Integer(3)
            ]
        );
        assert_eq!(parsed.diagnostics.statements, 3);
        assert_eq!(parsed.diagnostics.records, 4);
    }

    #[test]
    fn order_is_stable_across_worker_counts() {
        let mut dump = String::new();
        for i in 0..200 {
            dump.push_str(&format!("INSERT INTO t (a) VALUES ({}),({});\n", i * 2, i * 2 + 1));
        }
        let options = ParseOptions {
            workers: 4,
            ..ParseOptions::default()
        };
        let parsed = parse_dump(&dump, &options, None).unwrap();
        let values: Vec<i64> = parsed
            .tables
            .get("t")
            .unwrap()
            .iter()
            .map(|r| match r["a"] {
                ScalarValue::Integer(i) => i,
                _ => -1,
            })
            .collect();
        assert_eq!(values, (0..400).collect::<Vec<i64>>());
    }

    #[test]
    fn empty_dump_is_not_an_error() {
        let parsed = parse("-- nothing here\nCREATE TABLE t (a int);\n");
        assert!(parsed.tables.is_empty());
        assert_eq!(parsed.diagnostics, Diagnostics::default());
    }

    #[test]
    fn malformed_statement_does_not_stop_the_run() {
        let dump = "INSERT INTO bad (a) SELECT 1;\nINSERT INTO good (a) VALUES (1);";
        let parsed = parse(dump);
        assert_eq!(parsed.tables.len(), 1);
        assert_eq!(parsed.diagnostics.dropped_statements(), 1);
    }
}

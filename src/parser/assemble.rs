// Record assembly: zip decoded rows against a statement's column list.
// Rows whose value count disagrees with the column count are dropped and reported.

use super::insert::Statement;
use super::rows::tokenize_rows;
use super::value::{lex_scalar_tracked, ScalarValue};
use super::Record;
use crate::error::{Diagnostics, ScanIssue};
use crate::logger;

// Zip each row against `statement.columns`. Mismatched rows never affect the others.
pub fn assemble(statement: &Statement, rows: &[Vec<ScalarValue>]) -> (Vec<Record>, Vec<ScanIssue>) {
    let columns = &statement.columns;
    let mut records = Vec::with_capacity(rows.len());
    let mut issues = Vec::new();

    for values in rows {
        if values.len() != columns.len() {
            logger::debug(&format!(
                "Assemble: skip row for {} (expected {}, got {})",
                statement.table_name,
                columns.len(),
                values.len()
            ));
            issues.push(ScanIssue::RowFieldCountMismatch {
                table: statement.table_name.clone(),
                expected: columns.len(),
                actual: values.len(),
            });
            continue;
        }
        let record: Record = columns.iter().cloned().zip(values.iter().cloned()).collect();
        records.push(record);
    }

    (records, issues)
}

// Result of decoding one statement end to end.
#[derive(Debug, Clone, Default)]
pub struct StatementOutcome {
    pub table: String,
    pub records: Vec<Record>,
    pub diagnostics: Diagnostics,
}

// Tokenize, lex and assemble one statement. An unbalanced values clause
// drops the whole statement, keeping only its diagnostic.
pub fn decode_statement(statement: &Statement) -> StatementOutcome {
    let mut diagnostics = Diagnostics {
        statements: 1,
        ..Diagnostics::default()
    };
    let mut rows: Vec<Vec<ScalarValue>> = Vec::new();

    for raw in tokenize_rows(&statement.raw_values_text) {
        match raw {
            Ok(raw) => {
                let values = raw
                    .fields
                    .iter()
                    .map(|field| {
                        let (value, downgraded) = lex_scalar_tracked(field);
                        if downgraded {
                            diagnostics.structured_fallbacks += 1;
                        }
                        value
                    })
                    .collect();
                rows.push(values);
            }
            Err(unbalanced) => {
                logger::debug(&format!(
                    "DecodeStatement: {} values clause unbalanced ({:?})",
                    statement.table_name, unbalanced.state
                ));
                diagnostics.push(ScanIssue::UnbalancedQuoteOrBrace {
                    table: statement.table_name.clone(),
                    offset: statement.offset,
                    state: unbalanced.state,
                });
                return StatementOutcome {
                    table: statement.table_name.clone(),
                    records: Vec::new(),
                    diagnostics,
                };
            }
        }
    }

    diagnostics.rows = rows.len();
    let (records, issues) = assemble(statement, &rows);
    diagnostics.records = records.len();
    diagnostics.issues.extend(issues);

    logger::debug(&format!(
        "DecodeStatement: {} has {} rows, {} records",
        statement.table_name,
        diagnostics.rows,
        diagnostics.records
    ));

    StatementOutcome {
        table: statement.table_name.clone(),
        records,
        diagnostics,
    }
}

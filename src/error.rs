// Scan diagnostics: conditions that drop a statement or a row but never abort a run.
// Issues are collected as values in `Diagnostics` and reported at the end.

use std::fmt;
use thiserror::Error;

// Why a statement was rejected before its rows could be tokenized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    // Column list never closed before end of input.
    UnterminatedColumnList,
    // No VALUES keyword within the lookahead window after the column list.
    MissingValues,
    // Text ran out before the closing `;`.
    UnterminatedStatement,
}

impl fmt::Display for MalformedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnterminatedColumnList => write!(f, "unterminated column list"),
            Self::MissingValues => write!(f, "VALUES keyword not found"),
            Self::UnterminatedStatement => write!(f, "no terminating ';'"),
        }
    }
}

// Scanner state at the point input ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenConstruct {
    String,
    Json(u32),
    Row(u32),
}

impl fmt::Display for OpenConstruct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => write!(f, "inside a quoted string"),
            Self::Json(depth) => write!(f, "inside embedded JSON at depth {}", depth),
            Self::Row(depth) => write!(f, "inside a row tuple at depth {}", depth),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScanIssue {
    #[error("malformed INSERT for `{table}` at offset {offset}: {reason}")]
    MalformedStatement {
        table: String,
        offset: usize,
        reason: MalformedReason,
    },

    #[error("row for `{table}` has {actual} values, expected {expected}")]
    RowFieldCountMismatch {
        table: String,
        expected: usize,
        actual: usize,
    },

    #[error("input for `{table}` ended at offset {offset} {state}")]
    UnbalancedQuoteOrBrace {
        table: String,
        offset: usize,
        state: OpenConstruct,
    },
}

impl ScanIssue {
    pub fn table(&self) -> &str {
        match self {
            Self::MalformedStatement { table, .. }
            | Self::RowFieldCountMismatch { table, .. }
            | Self::UnbalancedQuoteOrBrace { table, .. } => table,
        }
    }

    // Row-level issues drop one row; the rest drop the whole statement.
    pub fn is_row_level(&self) -> bool {
        matches!(self, Self::RowFieldCountMismatch { .. })
    }
}

// Accumulator returned alongside scan results.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct Diagnostics {
    pub statements: usize,
    pub rows: usize,
    pub records: usize,
    pub structured_fallbacks: usize,
    #[serde(serialize_with = "serialize_issues")]
    pub issues: Vec<ScanIssue>,
}

impl Diagnostics {
    pub fn push(&mut self, issue: ScanIssue) {
        self.issues.push(issue);
    }

    // Fold another accumulator into this one, keeping issue order.
    pub fn merge(&mut self, other: Diagnostics) {
        self.statements += other.statements;
        self.rows += other.rows;
        self.records += other.records;
        self.structured_fallbacks += other.structured_fallbacks;
        self.issues.extend(other.issues);
    }

    pub fn mismatches(&self) -> usize {
        self.issues.iter().filter(|i| i.is_row_level()).count()
    }

    pub fn dropped_statements(&self) -> usize {
        self.issues.iter().filter(|i| !i.is_row_level()).count()
    }
}

fn serialize_issues<S>(issues: &[ScanIssue], s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.collect_seq(issues.iter().map(|i| i.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_issue_order_and_sums_counters() {
        let mut a = Diagnostics {
            statements: 1,
            rows: 2,
            records: 2,
            structured_fallbacks: 0,
            issues: vec![ScanIssue::RowFieldCountMismatch {
                table: "t".into(),
                expected: 2,
                actual: 3,
            }],
        };
        let b = Diagnostics {
            statements: 1,
            rows: 0,
            records: 0,
            structured_fallbacks: 1,
            issues: vec![ScanIssue::MalformedStatement {
                table: "u".into(),
                offset: 40,
                reason: MalformedReason::MissingValues,
            }],
        };
        a.merge(b);
        assert_eq!(a.statements, 2);
        assert_eq!(a.structured_fallbacks, 1);
        assert_eq!(a.issues[0].table(), "t");
        assert_eq!(a.issues[1].table(), "u");
        assert_eq!(a.mismatches(), 1);
        assert_eq!(a.dropped_statements(), 1);
    }

    #[test]
    fn issue_messages_name_the_table() {
        let issue = ScanIssue::UnbalancedQuoteOrBrace {
            table: "games".into(),
            offset: 12,
            state: OpenConstruct::String,
        };
        assert_eq!(
            issue.to_string(),
            "input for `games` ended at offset 12 inside a quoted string"
        );
    }
}

// INSERT locator: finds `INSERT INTO <table> (<cols>) VALUES ...;` in dump text.
// We intentionally keep parsing simple (no full SQL grammar): a regex finds the
// statement head, character scanning finds the column list and the terminator.

use super::scan::{ScanState, Scanner};
use crate::error::{MalformedReason, ScanIssue};
use crate::logger;
use regex::Regex;
use std::sync::OnceLock;

// How far past the column list the VALUES keyword may appear (only whitespace may precede it).
pub const DEFAULT_VALUES_LOOKAHEAD: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub table_name: String,
    pub columns: Vec<String>,
    // Text between VALUES and the terminating `;`, exclusive.
    pub raw_values_text: String,
    // Byte offset of the `INSERT` keyword.
    pub offset: usize,
}

fn insert_head_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r#"(?i:INSERT\s+INTO)\s+(?:`([^`]+)`|"([^"]+)"|([A-Za-z_][A-Za-z0-9_$]*))\s*\("#,
        )
        .expect("valid insert head regex")
    })
}

fn values_keyword_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*(?i:VALUES)\b\s*").expect("valid values regex"))
}

// Lazy sequence of statements. Malformed statements surface as `Err` items and
// scanning resumes past them; the iterator ends when no further head matches.
pub struct StatementLocator<'a> {
    text: &'a str,
    pos: usize,
    lookahead: usize,
}

pub fn locate_statements(text: &str) -> StatementLocator<'_> {
    StatementLocator::new(text)
}

impl<'a> StatementLocator<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            lookahead: DEFAULT_VALUES_LOOKAHEAD,
        }
    }

    pub fn with_lookahead(mut self, lookahead: usize) -> Self {
        self.lookahead = lookahead;
        self
    }

    // Byte position the next search starts from.
    pub fn position(&self) -> usize {
        self.pos
    }

    // Locate one statement at or after `from`. Returns the outcome and the
    // position to resume from, or None when no statement head remains.
    pub fn locate_at(&self, from: usize) -> Option<(Result<Statement, ScanIssue>, usize)> {
        let text = self.text;
        let caps = insert_head_re().captures_at(text, from)?;
        let head = caps.get(0)?;
        let table = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())?;
        let offset = head.start();

        logger::debug(&format!("LocateStatements: INSERT for {} at {}", table, offset));

        let malformed = |reason: MalformedReason| ScanIssue::MalformedStatement {
            table: table.clone(),
            offset,
            reason,
        };

        // Column list: depth starts at 1 just past the opening paren.
        // Parens inside quoted identifiers are not special-cased.
        let cols_start = head.end();
        let mut depth = 1u32;
        let mut cols_end = None;
        for (i, c) in text[cols_start..].char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        cols_end = Some(cols_start + i);
                        break;
                    }
                }
                _ => {}
            }
        }
        let cols_end = match cols_end {
            Some(end) => end,
            None => {
                return Some((
                    Err(malformed(MalformedReason::UnterminatedColumnList)),
                    text.len(),
                ))
            }
        };
        let columns = split_column_list(&text[cols_start..cols_end]);
        let after_cols = cols_end + 1;

        let window_end = floor_char_boundary(text, after_cols.saturating_add(self.lookahead));
        let values_start = match values_keyword_re().find(&text[after_cols..window_end]) {
            Some(m) => after_cols + m.end(),
            None => {
                return Some((Err(malformed(MalformedReason::MissingValues)), after_cols));
            }
        };

        // Terminator: first top-level `;`, honoring quotes and backslash escapes.
        // A top-level statement head before any `;` means this one never ended.
        let mut scanner = Scanner::new();
        let mut values_end = None;
        let mut next_head = insert_head_re().find_at(text, values_start).map(|m| m.start());
        for (i, c) in text[values_start..].char_indices() {
            let at = values_start + i;
            if next_head == Some(at) {
                if scanner.state() == ScanState::Default {
                    logger::debug(&format!(
                        "LocateStatements: {} at {} runs into the next INSERT at {}",
                        table, offset, at
                    ));
                    return Some((Err(malformed(MalformedReason::UnterminatedStatement)), at));
                }
                // Heads start with an ASCII letter, so `at + 1` is a char boundary.
                next_head = insert_head_re().find_at(text, at + 1).map(|m| m.start());
            }
            if scanner.step(c) && c == ';' {
                values_end = Some(at);
                break;
            }
        }
        let values_end = match values_end {
            Some(end) => end,
            None => {
                let issue = match scanner.open_construct() {
                    Some(state) => ScanIssue::UnbalancedQuoteOrBrace {
                        table: table.clone(),
                        offset: text.len(),
                        state,
                    },
                    None => malformed(MalformedReason::UnterminatedStatement),
                };
                return Some((Err(issue), text.len()));
            }
        };

        let statement = Statement {
            table_name: table,
            columns,
            raw_values_text: text[values_start..values_end].to_string(),
            offset,
        };
        Some((Ok(statement), values_end + 1))
    }
}

impl<'a> Iterator for StatementLocator<'a> {
    type Item = Result<Statement, ScanIssue>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos > self.text.len() {
            return None;
        }
        let (outcome, next_pos) = self.locate_at(self.pos)?;
        self.pos = next_pos;
        Some(outcome)
    }
}

// Split on top-level commas and strip whitespace and identifier quotes.
fn split_column_list(list: &str) -> Vec<String> {
    let mut columns = Vec::new();
    let mut depth = 0u32;
    let mut start = 0usize;
    let push = |part: &str, columns: &mut Vec<String>| {
        let col = part.trim().trim_matches(['`', '"', '\''].as_ref()).trim();
        if !col.is_empty() {
            columns.push(col.to_string());
        }
    };
    for (i, c) in list.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                push(&list[start..i], &mut columns);
                start = i + 1;
            }
            _ => {}
        }
    }
    push(&list[start..], &mut columns);
    columns
}

fn floor_char_boundary(text: &str, mut idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    while !text.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

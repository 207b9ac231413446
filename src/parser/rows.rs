// Row tokenizer: split a VALUES clause into parenthesized tuples, then each tuple
// into raw field fragments. Commas, parens and braces inside quoted strings
// (including embedded JSON) are content, not structure.

use super::scan::Scanner;
use crate::error::OpenConstruct;

// One tuple from a VALUES clause with its top-level fields, still undecoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow<'a> {
    // Text between the tuple's outer parens.
    pub span: &'a str,
    pub fields: Vec<&'a str>,
}

// The clause ended mid-string, mid-JSON or mid-tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unbalanced {
    pub offset: usize,
    pub state: OpenConstruct,
}

pub struct RowTokenizer<'a> {
    text: &'a str,
    pos: usize,
    done: bool,
}

pub fn tokenize_rows(raw_values_text: &str) -> RowTokenizer<'_> {
    RowTokenizer {
        text: raw_values_text,
        pos: 0,
        done: false,
    }
}

impl<'a> Iterator for RowTokenizer<'a> {
    type Item = Result<RawRow<'a>, Unbalanced>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut scanner = Scanner::new();
        let mut depth = 0u32;
        let mut start = 0usize;

        for (i, c) in self.text[self.pos..].char_indices() {
            let at = self.pos + i;
            if !scanner.step(c) {
                continue;
            }
            match c {
                '(' => {
                    if depth == 0 {
                        start = at + 1;
                    }
                    depth += 1;
                }
                ')' if depth > 0 => {
                    depth -= 1;
                    if depth == 0 {
                        let span = &self.text[start..at];
                        let fields = split_fields(span);
                        if fields.is_empty() {
                            // Empty tuple: keep scanning for the next one.
                            continue;
                        }
                        self.pos = at + 1;
                        return Some(Ok(RawRow { span, fields }));
                    }
                }
                _ => {}
            }
        }

        self.done = true;
        let state = match scanner.open_construct() {
            Some(open) => open,
            None if depth > 0 => OpenConstruct::Row(depth),
            None => return None,
        };
        Some(Err(Unbalanced {
            offset: self.text.len(),
            state,
        }))
    }
}

// Split a tuple body on top-level commas. Fragments are trimmed; a trailing
// whitespace-only fragment is dropped, so `()` yields no fields.
pub fn split_fields(span: &str) -> Vec<&str> {
    let mut fields = Vec::new();
    let mut scanner = Scanner::new();
    let mut depth = 0u32;
    let mut start = 0usize;

    for (i, c) in span.char_indices() {
        if !scanner.step(c) {
            continue;
        }
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                fields.push(span[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = span[start..].trim();
    if !last.is_empty() {
        fields.push(last);
    }
    fields
}

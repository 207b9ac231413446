// Character-level state machine shared by the statement locator and the row tokenizer.
// Both walk the same quote/escape/JSON-span rules so their boundaries never drift apart.

use crate::error::OpenConstruct;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Default,
    InString,
    // Inside a quoted string whose content opened a `{`; depth of unclosed braces.
    InStringJson(u32),
}

#[derive(Debug, Clone)]
pub struct Scanner {
    state: ScanState,
    escape_next: bool,
}

impl Default for Scanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner {
    pub fn new() -> Self {
        Self {
            state: ScanState::Default,
            escape_next: false,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    // Feed one character. Returns true when the character is structural:
    // unescaped, outside any string, and not a quote itself.
    pub fn step(&mut self, c: char) -> bool {
        if self.escape_next {
            self.escape_next = false;
            return false;
        }
        if c == '\\' {
            self.escape_next = true;
            return false;
        }
        match (self.state, c) {
            (ScanState::Default, '\'') => {
                self.state = ScanState::InString;
                false
            }
            (ScanState::Default, _) => true,
            // An unescaped quote closes the string whatever the brace depth.
            (ScanState::InString | ScanState::InStringJson(_), '\'') => {
                self.state = ScanState::Default;
                false
            }
            (ScanState::InString, '{') => {
                self.state = ScanState::InStringJson(1);
                false
            }
            (ScanState::InStringJson(depth), '{') => {
                self.state = ScanState::InStringJson(depth + 1);
                false
            }
            (ScanState::InStringJson(depth), '}') => {
                self.state = if depth <= 1 {
                    ScanState::InString
                } else {
                    ScanState::InStringJson(depth - 1)
                };
                false
            }
            _ => false,
        }
    }

    // What is still open, if anything, when input runs out.
    pub fn open_construct(&self) -> Option<OpenConstruct> {
        match self.state {
            ScanState::Default => None,
            ScanState::InString => Some(OpenConstruct::String),
            ScanState::InStringJson(depth) => Some(OpenConstruct::Json(depth)),
        }
    }
}

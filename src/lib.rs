// sqldumpjson: recover typed tables from SQL INSERT dumps without a full SQL grammar.
// The parser locates statements, tokenizes rows and lexes values; the rest of
// the crate projects types, compacts keys, mirrors into SQLite and reports counts.

pub mod compact;
pub mod config;
pub mod dump;
pub mod error;
pub mod logger;
pub mod parser;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod report;
pub mod store;

pub use error::{Diagnostics, ScanIssue};
pub use parser::{
    assemble, lex_scalar, locate_statements, tokenize_rows, Record, ScalarValue, Statement,
    TableSet,
};
pub use pipeline::{parse_dump, ParseOptions, ParsedDump};
pub use project::{project_types, ColumnType, ColumnTypeInfo};

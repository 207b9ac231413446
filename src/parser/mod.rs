// Parser module: locate INSERT statements, split their VALUES clause into rows,
// decode each field into a typed scalar, and assemble named records per table.

pub mod assemble;
pub mod insert;
pub mod rows;
pub mod scan;
pub mod value;

pub use assemble::{assemble, decode_statement, StatementOutcome};
pub use insert::{locate_statements, Statement, StatementLocator, DEFAULT_VALUES_LOOKAHEAD};
pub use rows::{tokenize_rows, RawRow, RowTokenizer, Unbalanced};
pub use value::{lex_scalar, ScalarValue};

use indexmap::IndexMap;

// One decoded row: column name -> value, in declared column order.
pub type Record = IndexMap<String, ScalarValue>;

// Table name -> records, both in encounter order.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct TableSet {
    tables: IndexMap<String, Vec<Record>>,
}

impl TableSet {
    pub fn new() -> Self {
        Self::default()
    }

    // Append records to a table, creating it on first sight.
    pub fn extend_table(&mut self, table: &str, records: Vec<Record>) {
        match self.tables.get_mut(table) {
            Some(existing) => existing.extend(records),
            None => {
                self.tables.insert(table.to_string(), records);
            }
        }
    }

    pub fn get(&self, table: &str) -> Option<&[Record]> {
        self.tables.get(table).map(|r| r.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<Record>)> {
        self.tables.iter()
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn total_records(&self) -> usize {
        self.tables.values().map(|r| r.len()).sum()
    }

    pub fn into_inner(self) -> IndexMap<String, Vec<Record>> {
        self.tables
    }

    pub fn from_json_str(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    // Pretty output uses two-space indentation; minified has no whitespace.
    pub fn to_json(&self, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(self)
        } else {
            serde_json::to_string(self)
        }
    }
}

impl From<IndexMap<String, Vec<Record>>> for TableSet {
    fn from(tables: IndexMap<String, Vec<Record>>) -> Self {
        Self { tables }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(pairs: &[(&str, ScalarValue)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn extend_table_appends_in_call_order() {
        let mut set = TableSet::new();
        set.extend_table("t", vec![record(&[("a", ScalarValue::Integer(1))])]);
        set.extend_table("u", vec![record(&[("a", ScalarValue::Null)])]);
        set.extend_table("t", vec![record(&[("a", ScalarValue::Integer(2))])]);

        let names: Vec<&str> = set.table_names().collect();
        assert_eq!(names, vec!["t", "u"]);
        let t = set.get("t").unwrap();
        assert_eq!(t[0]["a"], ScalarValue::Integer(1));
        assert_eq!(t[1]["a"], ScalarValue::Integer(2));
        assert_eq!(set.total_records(), 3);
    }

    #[test]
    fn json_output_keeps_column_order() {
        let mut set = TableSet::new();
        set.extend_table(
            "t",
            vec![record(&[
                ("zeta", ScalarValue::Integer(1)),
                ("alpha", ScalarValue::Text("x".into())),
                ("mid", ScalarValue::Null),
            ])],
        );
        let json = set.to_json(false).unwrap();
        assert_eq!(json, r#"{"t":[{"zeta":1,"alpha":"x","mid":null}]}"#);

        let back = TableSet::from_json_str(&json).unwrap();
        assert_eq!(back, set);
    }
}

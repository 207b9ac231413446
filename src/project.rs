// Type projection: infer one storage type per column from the first non-null
// value in record order, and re-encode values for a store without JSON columns.

use crate::parser::{Record, ScalarValue};
use ahash::{AHashMap, AHashSet};
use indexmap::IndexMap;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum ColumnType {
    Boolean,
    Integer,
    Real,
    Json,
    Text,
}

impl ColumnType {
    // Type implied by a single value; None for nulls.
    pub fn of(value: &ScalarValue) -> Option<Self> {
        match value {
            ScalarValue::Null => None,
            ScalarValue::Integer(_) => Some(Self::Integer),
            ScalarValue::Real(_) => Some(Self::Real),
            ScalarValue::Text(_) => Some(Self::Text),
            ScalarValue::Structured(v) => match v {
                Value::Null => None,
                Value::Bool(_) => Some(Self::Boolean),
                Value::Number(n) if n.is_i64() || n.is_u64() => Some(Self::Integer),
                Value::Number(_) => Some(Self::Real),
                Value::String(_) => Some(Self::Text),
                Value::Array(_) | Value::Object(_) => Some(Self::Json),
            },
        }
    }

    pub fn sql_name(&self) -> &'static str {
        match self {
            Self::Boolean => "BOOLEAN",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
            Self::Json => "JSON",
            Self::Text => "TEXT",
        }
    }
}

// Column name -> inferred type, in column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ColumnTypeInfo {
    columns: IndexMap<String, ColumnType>,
}

impl ColumnTypeInfo {
    pub fn get(&self, column: &str) -> Option<ColumnType> {
        self.columns.get(column).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, ColumnType)> {
        self.columns.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

// A value ready for a store with only null/integer/real/text cells.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl StoredValue {
    // Booleans become 0/1 and structured trees become compact JSON text.
    pub fn from_scalar(value: &ScalarValue) -> Self {
        match value {
            ScalarValue::Null => Self::Null,
            ScalarValue::Integer(i) => Self::Integer(*i),
            ScalarValue::Real(f) => Self::Real(*f),
            ScalarValue::Text(s) => Self::Text(s.clone()),
            ScalarValue::Structured(v) => match v {
                Value::Null => Self::Null,
                Value::Bool(b) => Self::Integer(i64::from(*b)),
                Value::Number(n) => match (n.as_i64(), n.as_f64()) {
                    (Some(i), _) => Self::Integer(i),
                    (None, Some(f)) => Self::Real(f),
                    (None, None) => Self::Text(n.to_string()),
                },
                Value::String(s) => Self::Text(s.clone()),
                tree => Self::Text(canonical_json(tree)),
            },
        }
    }
}

// Compact serialization with key order preserved.
pub fn canonical_json(value: &Value) -> String {
    value.to_string()
}

// Infer column types for one table with no exclusions.
pub fn project_types(records: &[Record]) -> ColumnTypeInfo {
    infer(records, &AHashSet::new())
}

// Table-scoped column exclusions applied before inference.
#[derive(Debug, Clone, Default)]
pub struct TypeProjector {
    exclusions: AHashMap<String, AHashSet<String>>,
}

impl TypeProjector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exclude(mut self, table: &str, column: &str) -> Self {
        self.exclusions
            .entry(table.to_string())
            .or_default()
            .insert(column.to_string());
        self
    }

    pub fn is_excluded(&self, table: &str, column: &str) -> bool {
        self.exclusions
            .get(table)
            .is_some_and(|cols| cols.contains(column))
    }

    pub fn project_types(&self, table: &str, records: &[Record]) -> ColumnTypeInfo {
        match self.exclusions.get(table) {
            Some(excluded) => infer(records, excluded),
            None => infer(records, &AHashSet::new()),
        }
    }

    // One stored row per record, cells in `types` column order; absent keys are null.
    pub fn project_record(&self, types: &ColumnTypeInfo, record: &Record) -> Vec<StoredValue> {
        types
            .column_names()
            .map(|col| {
                record
                    .get(col)
                    .map(StoredValue::from_scalar)
                    .unwrap_or(StoredValue::Null)
            })
            .collect()
    }
}

// Columns are the union of record keys in first-seen order. Each takes the
// type of its first non-null value; all-null columns are Text.
fn infer(records: &[Record], excluded: &AHashSet<String>) -> ColumnTypeInfo {
    let mut columns: IndexMap<String, Option<ColumnType>> = IndexMap::new();
    for record in records {
        for (name, value) in record {
            if excluded.contains(name) {
                continue;
            }
            let slot = columns.entry(name.clone()).or_insert(None);
            if slot.is_none() {
                *slot = ColumnType::of(value);
            }
        }
    }
    ColumnTypeInfo {
        columns: columns
            .into_iter()
            .map(|(name, ty)| (name, ty.unwrap_or(ColumnType::Text)))
            .collect(),
    }
}

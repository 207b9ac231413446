// Key compaction: rename record keys through a fixed table and drop unused
// fields, recursing into structured values. Tables named in the drop set go too.

use crate::logger;
use crate::parser::{Record, ScalarValue, TableSet};
use ahash::{AHashMap, AHashSet};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Default)]
pub struct KeyCompactor {
    renames: AHashMap<String, String>,
    drop: AHashSet<String>,
}

impl KeyCompactor {
    pub fn new<'a>(
        renames: impl IntoIterator<Item = (&'a str, &'a str)>,
        drop: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        Self {
            renames: renames
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            drop: drop.into_iter().map(|s| s.to_string()).collect(),
        }
    }

    fn rename<'k>(&'k self, key: &'k str) -> &'k str {
        self.renames.get(key).map(|s| s.as_str()).unwrap_or(key)
    }

    pub fn compact(&self, tables: TableSet) -> TableSet {
        let mut out = TableSet::new();
        for (name, records) in tables.into_inner() {
            if self.drop.contains(&name) {
                logger::debug(&format!("Compact: dropping table {}", name));
                continue;
            }
            let records = records.into_iter().map(|r| self.compact_record(r)).collect();
            out.extend_table(&name, records);
        }
        out
    }

    pub fn compact_record(&self, record: Record) -> Record {
        record
            .into_iter()
            .filter(|(k, _)| !self.drop.contains(k))
            .map(|(k, v)| {
                let v = match v {
                    ScalarValue::Structured(tree) => ScalarValue::Structured(self.compact_value(tree)),
                    other => other,
                };
                (self.rename(&k).to_string(), v)
            })
            .collect()
    }

    fn compact_value(&self, value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut out = Map::with_capacity(map.len());
                for (k, v) in map {
                    if self.drop.contains(&k) {
                        continue;
                    }
                    out.insert(self.rename(&k).to_string(), self.compact_value(v));
                }
                Value::Object(out)
            }
            Value::Array(items) => {
                Value::Array(items.into_iter().map(|v| self.compact_value(v)).collect())
            }
            other => other,
        }
    }
}

// Run configuration: key compaction table, dropped fields, projector exclusions,
// indexed columns. Loaded from an optional JSON file; every key has a default.

use crate::compact::KeyCompactor;
use crate::logger;
use crate::parser::DEFAULT_VALUES_LOOKAHEAD;
use crate::project::TypeProjector;
use indexmap::IndexMap;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub key_map: IndexMap<String, String>,
    pub drop_fields: Vec<String>,
    pub exclude_columns: IndexMap<String, Vec<String>>,
    pub index_columns: Vec<String>,
    pub values_lookahead: usize,
}

impl Default for Config {
    fn default() -> Self {
        let key_map = [
            ("image", "img"),
            ("game_id", "gid"),
            ("player_id", "pid"),
            ("class_name", "cls"),
            ("profile_link", "link"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let mut exclude_columns = IndexMap::new();
        exclude_columns.insert("games".to_string(), vec!["cls".to_string()]);

        Self {
            key_map,
            drop_fields: vec![
                "created_at".to_string(),
                "updated_at".to_string(),
                "schema_migrations".to_string(),
            ],
            exclude_columns,
            index_columns: vec!["gid".to_string(), "pid".to_string(), "tid".to_string()],
            values_lookahead: DEFAULT_VALUES_LOOKAHEAD,
        }
    }
}

impl Config {
    // Defaults when no path is given; a missing or invalid file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        let path = match path {
            Some(p) => p,
            None => return Ok(Self::default()),
        };
        logger::debug(&format!("Config: Loading {}", path.display()));
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| format!("invalid config {}: {}", path.display(), e))?;
        if config.values_lookahead == 0 {
            return Err("values_lookahead must be greater than 0".into());
        }
        Ok(config)
    }

    pub fn compactor(&self) -> KeyCompactor {
        KeyCompactor::new(
            self.key_map.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            self.drop_fields.iter().map(|f| f.as_str()),
        )
    }

    pub fn projector(&self) -> TypeProjector {
        let mut projector = TypeProjector::new();
        for (table, columns) in &self.exclude_columns {
            for column in columns {
                projector = projector.exclude(table, column);
            }
        }
        projector
    }
}

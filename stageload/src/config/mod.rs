//! Pipeline configuration model.
//!
//! The configuration is a JSON document mapping table name to column rules:
//!
//! ```json
//! {
//!   "trips": {
//!     "trip_id":    { "required": true, "type": "Integer", "parse": [ { "ToInt": null } ] },
//!     "price":      { "type": "Float",  "parse": [ { "Replace": ["$", ""] }, { "ToFloat": 2 } ] },
//!     "started_at": { "type": "Timestamp" }
//!   }
//! }
//! ```
//!
//! Parse steps are declarative data, not code: each is a single-entry map
//! whose key names a registry entry and whose value carries the construction
//! arguments (`null` for none, a scalar for one, an array for several).
//! Steps are resolved against the registry when the column pipeline is
//! built, never evaluated as configuration text.
//!
//! Column order within a table is the declared document order and is
//! preserved through to the canonical output headers.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::ConfigResult;
use crate::models::SemanticType;

// =============================================================================
// Step Invocations
// =============================================================================

/// A declarative reference to a registry step and its construction
/// arguments.
///
/// Resolution against the registry happens at pipeline-build time; an
/// unknown name or malformed argument literal is fatal for the table's
/// configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct StepInvocation {
    /// Registry entry name, e.g. `"Replace"`.
    pub name: String,
    /// Ordered argument literals.
    pub args: Vec<Value>,
}

impl StepInvocation {
    pub fn new(name: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }
}

impl<'de> Deserialize<'de> for StepInvocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct StepVisitor;

        impl<'de> Visitor<'de> for StepVisitor {
            type Value = StepInvocation;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a single-entry map of step name to arguments")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let (name, raw_args) = map
                    .next_entry::<String, Value>()?
                    .ok_or_else(|| serde::de::Error::custom("parse step map is empty"))?;

                if map.next_entry::<String, Value>()?.is_some() {
                    return Err(serde::de::Error::custom(
                        "parse step must be a single-entry map",
                    ));
                }

                let args = match raw_args {
                    Value::Null => Vec::new(),
                    Value::Array(items) => items,
                    scalar => vec![scalar],
                };

                Ok(StepInvocation { name, args })
            }
        }

        deserializer.deserialize_map(StepVisitor)
    }
}

// =============================================================================
// Column Rules
// =============================================================================

/// Declarative processing rule for one column. Immutable after load.
#[derive(Debug, Clone, Deserialize)]
pub struct ColumnRule {
    /// Rows with this column absent or empty are dropped entirely.
    #[serde(default)]
    pub required: bool,

    /// Ordered parse steps applied before the terminal type cast.
    #[serde(default)]
    pub parse: Vec<StepInvocation>,

    /// Target semantic type for the terminal cast and the canonical header.
    #[serde(rename = "type", default)]
    pub target_type: SemanticType,
}

// =============================================================================
// Table Configuration
// =============================================================================

/// All column rules for one table, in declared order.
#[derive(Debug, Clone)]
pub struct TableConfig {
    columns: Vec<(String, ColumnRule)>,
}

impl TableConfig {
    pub fn new(columns: Vec<(String, ColumnRule)>) -> Self {
        Self { columns }
    }

    /// Columns in declared order.
    pub fn columns(&self) -> &[(String, ColumnRule)] {
        &self.columns
    }

    pub fn get(&self, name: &str) -> Option<&ColumnRule> {
        self.columns
            .iter()
            .find(|(col, _)| col == name)
            .map(|(_, rule)| rule)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl<'de> Deserialize<'de> for TableConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = TableConfig;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of column name to column rule")
            }

            // Collected by hand so document order survives deserialization.
            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut columns = Vec::new();
                while let Some((name, rule)) = map.next_entry::<String, ColumnRule>()? {
                    columns.push((name, rule));
                }
                Ok(TableConfig { columns })
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// The full pipeline configuration: one [`TableConfig`] per table.
#[derive(Debug, Clone, Deserialize)]
#[serde(transparent)]
pub struct PipelineConfig {
    tables: HashMap<String, TableConfig>,
}

impl PipelineConfig {
    /// Parse a configuration from a JSON string.
    pub fn from_json(json: &str) -> ConfigResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Look up the configuration for a table, if declared.
    pub fn table(&self, name: &str) -> Option<&TableConfig> {
        self.tables.get(name)
    }

    /// Declared table names.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

//! Mutable configuration store validated against the schema registry.
//!
//! The store is the only mutable configuration state in the core. It provides:
//! 1. **Seeding:** Every schema parameter is pre-populated with its default.
//! 2. **Validated writes:** [`ConfigStore::set`] consults the schema before
//!    storing; no invalid value can ever be present.
//! 3. **Persistence:** The textual `name = value` line format is parsed and
//!    serialized here; file I/O stays with external collaborators.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::warn;

use crate::schema::Schema;

/// Errors surfaced by the configuration store and the state derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The parameter exists in neither the store nor the schema.
    ///
    /// This is the one condition with no reasonable fallback: the caller
    /// asked for something the system has never heard of.
    #[error("parameter not found: {0}")]
    NotFound(String),

    /// A stored value could not be parsed as the numeric type a consumer
    /// expected. Reaching this means a schema rule and a consumer disagree
    /// about a parameter's shape.
    #[error("parameter {name} has unparsable value {value:?}")]
    Malformed {
        /// The parameter whose value failed to parse.
        name: String,
        /// The offending stored value.
        value: String,
    },
}

/// Key/value store of configuration parameters.
///
/// Invariant: every key has a schema definition and its value satisfies that
/// definition's rule. Validation is a precondition to every write, so the
/// invariant holds at all times without periodic checks.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    values: BTreeMap<String, String>,
    schema: &'static Schema,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore {
    /// Creates a store with every schema parameter set to its default.
    pub fn new() -> Self {
        let schema = Schema::global();
        let values = schema
            .names()
            .filter_map(|name| {
                schema
                    .default_for(name)
                    .map(|default| (name.to_owned(), default.to_owned()))
            })
            .collect();
        Self { values, schema }
    }

    /// Sets a parameter after validating the value against the schema.
    ///
    /// On rejection the prior state is untouched and `false` is returned;
    /// there are no partial writes.
    pub fn set(&mut self, name: &str, value: &str) -> bool {
        if !self.schema.validate(name, value) {
            warn!(name, value, "rejected configuration write");
            return false;
        }
        let _ = self.values.insert(name.to_owned(), value.to_owned());
        true
    }

    /// Returns the stored value for a parameter.
    ///
    /// Falls back to the schema default when the store has no entry. Fails
    /// only when the name is absent from both the store and the schema.
    pub fn get(&self, name: &str) -> Result<String, ConfigError> {
        if let Some(value) = self.values.get(name) {
            return Ok(value.clone());
        }
        self.schema
            .default_for(name)
            .map(str::to_owned)
            .ok_or_else(|| ConfigError::NotFound(name.to_owned()))
    }

    /// Replaces the store contents from serialized `name = value` text.
    ///
    /// Blank lines and lines starting with `#` are skipped. Lines whose key
    /// is not in the schema are ignored (permissive by choice, so configs
    /// written by newer front-ends still load). The load aborts and returns
    /// `false` on the first line that is malformed (no `=`) or whose value
    /// fails validation; entries applied before the failing line remain, so
    /// a failed load leaves partial state.
    pub fn load(&mut self, text: &str) -> bool {
        self.values.clear();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((name, value)) = line.split_once('=') else {
                warn!(line, "malformed configuration line");
                return false;
            };
            let name = name.trim();
            let value = value.trim();
            if self.schema.lookup(name).is_none() {
                warn!(name, "ignoring unknown parameter in configuration text");
                continue;
            }
            if !self.set(name, value) {
                return false;
            }
        }
        true
    }

    /// Serializes the store as `name = value` lines.
    ///
    /// Iteration order is the sorted key order, stable across a process run.
    pub fn save(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.values {
            out.push_str(name);
            out.push_str(" = ");
            out.push_str(value);
            out.push('\n');
        }
        out
    }

    /// Iterates over all stored parameters in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Number of stored parameters.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether the store holds no parameters (only possible after a failed
    /// load cleared it before the first valid line).
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Reads a parameter and parses it as an unsigned decimal integer.
    pub(crate) fn get_unsigned(&self, name: &str) -> Result<u64, ConfigError> {
        let value = self.get(name)?;
        crate::schema::parse_unsigned(&value).ok_or_else(|| ConfigError::Malformed {
            name: name.to_owned(),
            value,
        })
    }

    /// Reads a parameter and parses it as a hex address.
    pub(crate) fn get_hex(&self, name: &str) -> Result<u64, ConfigError> {
        let value = self.get(name)?;
        crate::schema::parse_hex(&value).ok_or_else(|| ConfigError::Malformed {
            name: name.to_owned(),
            value,
        })
    }

    /// Reads a boolean parameter; any value other than `"true"` is `false`.
    pub(crate) fn get_flag(&self, name: &str) -> Result<bool, ConfigError> {
        Ok(self.get(name)? == "true")
    }
}

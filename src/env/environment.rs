//! Named environments and the layered value merge.
//!
//! An environment is built from zero or more values files, merged strictly in
//! declaration order so later files override earlier ones.

use tracing::debug;

use crate::error::{ConfigError, MergeError, Result};

use super::value::{Value, ValueMap};

/// Name of the environment that silently resolves to empty values when the
/// manifest does not declare it.
pub const DEFAULT_ENVIRONMENT: &str = "default";

/// A named set of templating values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Environment {
    name: String,
    values: ValueMap,
}

impl Environment {
    /// Creates an environment from a name and its values.
    #[must_use]
    pub fn new(name: impl Into<String>, values: ValueMap) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Creates an environment with no values.
    #[must_use]
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, ValueMap::new())
    }

    /// Parses one values file into an environment layer.
    ///
    /// An empty document is an empty layer. A top level that is not a map is
    /// a parse error.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid or cannot be represented as a
    /// value tree.
    pub fn from_yaml(name: &str, location: &str, content: &str) -> Result<Self> {
        debug!("Parsing environment values from {location}");

        if content.trim().is_empty() {
            return Ok(Self::empty(name));
        }

        let parse_error = |e: serde_yaml::Error| {
            ConfigError::parse(
                format!("Could not parse resulting yaml in env {name}: {e}"),
                location,
            )
        };

        let mut raw: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_error)?;
        raw.apply_merge().map_err(parse_error)?;

        let value = Value::try_from(raw).map_err(|source| MergeError::InvalidValues {
            environment: name.to_string(),
            location: location.to_string(),
            source,
        })?;

        match value {
            Value::Null => Ok(Self::empty(name)),
            Value::Map(values) => Ok(Self::new(name, values)),
            _ => Err(ConfigError::parse(
                format!("Environment values in env {name} must be a map"),
                location,
            )
            .into()),
        }
    }

    /// Returns the environment name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the merged values.
    #[must_use]
    pub const fn values(&self) -> &ValueMap {
        &self.values
    }

    /// Merges `overlay` on top of this environment and returns the result.
    ///
    /// Neither input is modified. Maps present on both sides are merged key by
    /// key; for every other conflict the overlay value wins, including an
    /// explicit null replacing a populated map. The result keeps this
    /// environment's name.
    #[must_use]
    pub fn merge(&self, overlay: &Self) -> Self {
        let mut values = self.values.clone();
        merge_maps(&mut values, &overlay.values);
        Self {
            name: self.name.clone(),
            values,
        }
    }
}

/// Recursively applies `src` onto `dst`.
fn merge_maps(dst: &mut ValueMap, src: &ValueMap) {
    for (key, value) in src {
        match (dst.get_mut(key), value) {
            (Some(Value::Map(existing)), Value::Map(incoming)) => merge_maps(existing, incoming),
            _ => {
                dst.insert(key.clone(), value.clone());
            }
        }
    }
}

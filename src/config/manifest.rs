//! Appfile manifest: the list of spec files and the named environments.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::env::DEFAULT_ENVIRONMENT;
use crate::error::{MergeError, Result};

/// The top-level appfile document.
///
/// ```yaml
/// specs:
///   - ./app.yaml
/// environments:
///   review:
///     - ./envs/common.yaml
///     - ./envs/review.yaml
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppfileManifest {
    /// App spec template paths, relative to the manifest.
    #[serde(default)]
    pub specs: Vec<String>,
    /// Environment name to ordered value file paths, relative to the manifest.
    #[serde(default)]
    pub environments: BTreeMap<String, Vec<String>>,
    /// Location of the manifest.
    #[serde(skip)]
    path: PathBuf,
}

impl AppfileManifest {
    /// Parses rendered manifest text. Returns `None` when the text is not a
    /// manifest or lists no specs.
    #[must_use]
    pub fn parse(content: &str, path: &Path) -> Option<Self> {
        let mut manifest: Self = serde_yaml::from_str(content).ok()?;
        if manifest.specs.is_empty() {
            return None;
        }
        manifest.path = path.to_path_buf();
        Some(manifest)
    }

    /// Returns the manifest location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns true when the environment is declared.
    #[must_use]
    pub fn has_environment(&self, name: &str) -> bool {
        self.environments.contains_key(name)
    }

    /// Resolves the spec template paths.
    #[must_use]
    pub fn spec_files(&self) -> Vec<PathBuf> {
        self.specs.iter().map(|s| self.resolve(s)).collect()
    }

    /// Resolves the value files of an environment, in declaration order.
    ///
    /// An undeclared `default` environment has no files.
    ///
    /// # Errors
    ///
    /// Returns an error if any other undeclared environment is requested.
    pub fn environment_files(&self, name: &str) -> Result<Vec<PathBuf>> {
        match self.environments.get(name) {
            Some(files) => Ok(files.iter().map(|f| self.resolve(f)).collect()),
            None if name == DEFAULT_ENVIRONMENT => Ok(Vec::new()),
            None => Err(MergeError::EnvironmentNotFound {
                name: name.to_string(),
                manifest: self.path.clone(),
            }
            .into()),
        }
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.path
            .parent()
            .map_or_else(|| PathBuf::from(relative), |dir| dir.join(relative))
    }
}

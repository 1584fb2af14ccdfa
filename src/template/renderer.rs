//! Jinja-style renderer for spec, manifest and environment files.

use std::path::Path;

use minijinja::{Environment, UndefinedBehavior, context};
use tracing::{debug, trace};

use crate::env::Value;
use crate::error::{Result, TemplateError};

use super::functions::{self, EnvLookup};

/// Renders template text against an optional value context.
///
/// Missing field references are errors. The extension functions
/// `requiredEnv` and `toYaml` are always registered, and `toYaml` is also
/// available as a filter.
pub struct TemplateRenderer {
    env: Environment<'static>,
}

impl TemplateRenderer {
    /// Creates a renderer that reads the process environment.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env_lookup(functions::process_env())
    }

    /// Creates a renderer whose `requiredEnv` uses the given lookup.
    #[must_use]
    pub fn with_env_lookup(lookup: EnvLookup) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.add_function("requiredEnv", functions::required_env(lookup));
        env.add_function("toYaml", functions::to_yaml);
        env.add_filter("toYaml", functions::to_yaml);
        Self { env }
    }

    /// Renders `text`, naming it `origin` in errors.
    ///
    /// # Errors
    ///
    /// Returns an error on syntax errors, undefined references, or a failing
    /// extension function.
    pub fn render(&self, origin: &str, text: &str, context: Option<&Value>) -> Result<String> {
        trace!("Rendering template {origin}");

        let rendered = match context {
            Some(ctx) => self.env.render_str(text, ctx),
            None => self.env.render_str(text, context! {}),
        };

        rendered.map_err(|e| {
            TemplateError::Render {
                origin: origin.to_string(),
                message: e.to_string(),
            }
            .into()
        })
    }

    /// Reads and renders the template at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or rendering fails.
    pub fn render_file(&self, path: &Path, context: Option<&Value>) -> Result<String> {
        debug!("Reading template {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.render(&path.display().to_string(), &text, context)
    }
}

impl Default for TemplateRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateRenderer").finish_non_exhaustive()
    }
}

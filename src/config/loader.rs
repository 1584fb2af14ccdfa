//! Spec loading pipeline.
//!
//! Renders the appfile, resolves the requested environment by merging its
//! value files in order, then renders, parses and defaults every app spec.
//! Any failure aborts the whole load.

use std::path::Path;

use tracing::{debug, info};

use crate::env::{Environment, Value, ValueMap};
use crate::error::{ConfigError, Result};
use crate::template::TemplateRenderer;

use super::manifest::AppfileManifest;
use super::spec::AppSpecification;

/// Loads fully resolved app specs from an appfile.
#[derive(Debug, Default)]
pub struct SpecLoader {
    renderer: TemplateRenderer,
}

impl SpecLoader {
    /// Creates a loader that reads the process environment in templates.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a loader with a custom renderer.
    #[must_use]
    pub const fn with_renderer(renderer: TemplateRenderer) -> Self {
        Self { renderer }
    }

    /// Loads every app declared by the file at `path` for `environment`.
    ///
    /// If the file is not a manifest it is read as a single app spec; no
    /// environment values apply in that case.
    ///
    /// # Errors
    ///
    /// Returns an error if any file is missing, fails to render, or does not
    /// parse.
    pub fn load(&self, path: &Path, environment: &str) -> Result<Vec<AppSpecification>> {
        info!("Loading appfile from: {}", path.display());

        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }
            .into());
        }

        let rendered = self.renderer.render_file(path, None)?;

        if let Some(manifest) = AppfileManifest::parse(&rendered, path) {
            debug!("Finished reading appfile spec");
            let env = self.read_environment(&manifest, environment)?;
            return self.read_apps(&manifest, &env);
        }

        debug!("Could not parse appfile specification from file {}", path.display());
        debug!("Trying to parse app specification instead");

        let spec = AppSpecification::from_yaml(&rendered, &path.display().to_string())?;
        Ok(vec![spec.with_source_file(path).with_defaults()])
    }

    /// Resolves a named environment by merging its value files in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment is unknown or a file cannot be
    /// rendered, parsed or merged.
    pub fn read_environment(&self, manifest: &AppfileManifest, name: &str) -> Result<Environment> {
        if !manifest.has_environment(name) {
            debug!("Using default environment without any defined values");
        }

        let mut env = Environment::empty(name);
        for file in manifest.environment_files(name)? {
            debug!("Reading environment values from {}", file.display());
            let rendered = self.renderer.render_file(&file, None)?;
            let layer = Environment::from_yaml(name, &file.display().to_string(), &rendered)?;
            env = env.merge(&layer);
        }

        Ok(env)
    }

    /// Renders, parses and defaults every spec of the manifest.
    ///
    /// # Errors
    ///
    /// Returns an error on the first spec that fails.
    pub fn read_apps(
        &self,
        manifest: &AppfileManifest,
        env: &Environment,
    ) -> Result<Vec<AppSpecification>> {
        let context = template_context(env);

        manifest
            .spec_files()
            .into_iter()
            .map(|file| {
                debug!("Reading app spec from {}", file.display());
                let rendered = self.renderer.render_file(&file, Some(&context))?;
                let spec = AppSpecification::from_yaml(&rendered, &file.display().to_string())?;
                Ok(spec.with_source_file(file).with_defaults())
            })
            .collect()
    }
}

/// Builds the context app spec templates are rendered with:
/// `{ environment: { name }, values }`.
#[must_use]
pub fn template_context(env: &Environment) -> Value {
    let mut environment = ValueMap::new();
    environment.insert(String::from("name"), Value::from(env.name()));

    let mut root = ValueMap::new();
    root.insert(String::from("environment"), Value::Map(environment));
    root.insert(String::from("values"), Value::Map(env.values().clone()));
    Value::Map(root)
}

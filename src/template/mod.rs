//! Template rendering module.
//!
//! This module provides Jinja-style rendering of manifest, environment and
//! spec files, including the `requiredEnv` and `toYaml` extension functions.

pub mod functions;
mod renderer;

pub use functions::EnvLookup;
pub use renderer::TemplateRenderer;

//! Configuration module for the Appfile deployment system.
//!
//! This module handles everything between the appfile on disk and a
//! resolved app spec:
//! - Parsing the manifest and resolving the requested environment
//! - Rendering, parsing and defaulting app specs
//! - Validation of resolved specs
//! - Computing spec fingerprints for change detection

mod defaults;
mod hash;
mod loader;
mod manifest;
mod spec;
mod validator;

pub use defaults::{DEFAULT_INSTANCE_COUNT, DEFAULT_INSTANCE_SIZE, DEFAULT_ROUTE_PATH};
pub use hash::SpecHasher;
pub use loader::{SpecLoader, template_context};
pub use manifest::AppfileManifest;
pub use spec::{
    AppSpecification, BuildSettings, DomainBinding, EnvVarDefinition, EnvVarScope, EnvVarType,
    GitHubSource, GitLabSource, GitSource, HealthCheck, ImageSource, JobKind, JobSettings,
    RegistryType, RouteSpec, ServiceSettings, StaticSiteSettings, Workload, WorkloadKind,
    WorkloadSource,
};
pub use validator::{
    ENV_KEY_PATTERN, KNOWN_INSTANCE_SIZES, NAME_PATTERN, REPO_PATTERN, SpecValidator,
    ValidationError, ValidationReport,
};

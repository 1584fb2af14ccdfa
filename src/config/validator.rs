//! Rule-based validation of resolved app specs.
//!
//! Every rule is a plain function returning its findings; the validator
//! concatenates them in a fixed order (name, source, env vars, instances)
//! and never stops at the first finding.

use std::fmt;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::error::{AppfileError, Result};

use super::spec::{AppSpecification, EnvVarDefinition, ImageSource, RegistryType, Workload, WorkloadSource};

/// Pattern for app and component names.
pub const NAME_PATTERN: &str = "^[a-z][a-z0-9-]{0,30}[a-z0-9]$";

/// Pattern for `owner/repo` strings.
pub const REPO_PATTERN: &str = "^[^/]+/[^/]+$";

/// Pattern for environment variable keys.
pub const ENV_KEY_PATTERN: &str = "^[_A-Za-z][_A-Za-z0-9]*$";

/// Instance sizes accepted by default.
pub const KNOWN_INSTANCE_SIZES: &[&str] = &[
    "basic-xxs",
    "basic-xs",
    "basic-s",
    "basic-m",
    "professional-xs",
    "professional-s",
    "professional-m",
    "professional-1l",
    "professional-l",
    "professional-xl",
];

const MIN_NAME_LENGTH: usize = 2;
const MAX_NAME_LENGTH: usize = 32;

/// Validator for app specs.
#[derive(Debug)]
pub struct SpecValidator {
    name: Regex,
    repo: Regex,
    env_key: Regex,
    instance_sizes: Vec<String>,
}

/// Findings for one app, in rule evaluation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    /// App the findings belong to.
    pub app: String,
    /// Findings.
    pub errors: Vec<ValidationError>,
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    /// Path of the offending field.
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl SpecValidator {
    /// Creates a validator with the default instance sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in pattern fails to compile.
    pub fn new() -> Result<Self> {
        Ok(Self {
            name: compile(NAME_PATTERN)?,
            repo: compile(REPO_PATTERN)?,
            env_key: compile(ENV_KEY_PATTERN)?,
            instance_sizes: KNOWN_INSTANCE_SIZES.iter().map(|s| (*s).to_string()).collect(),
        })
    }

    /// Adds an instance size slug to the accepted set.
    pub fn add_instance_size(&mut self, slug: impl Into<String>) {
        let slug = slug.into();
        if !self.instance_sizes.contains(&slug) {
            self.instance_sizes.push(slug);
        }
    }

    /// Validates a spec and returns every finding.
    #[must_use]
    pub fn validate(&self, spec: &AppSpecification) -> ValidationReport {
        let mut errors = self.validate_name("Spec", &spec.name, "name");
        errors.extend(self.validate_env_vars("Spec", &spec.name, &spec.env_vars, "envs"));

        for workload in &spec.workloads {
            errors.extend(self.validate_workload(workload));
        }

        debug!("Spec {} validated with {} finding(s)", spec.name, errors.len());

        ValidationReport {
            app: spec.name.clone(),
            errors,
        }
    }

    fn validate_workload(&self, workload: &Workload) -> Vec<ValidationError> {
        let label = workload.kind.label();
        let field = format!("{}[{}]", workload.kind.section(), workload.name);

        let mut errors = self.validate_name(label, &workload.name, &format!("{field}.name"));
        errors.extend(self.validate_source(label, &workload.name, &workload.source, &field));
        errors.extend(self.validate_env_vars(label, &workload.name, &workload.env_vars, &format!("{field}.envs")));

        if workload.kind.has_instances() {
            errors.extend(self.validate_instances(label, workload, &field));
        }

        errors
    }

    /// Length and pattern checks, reported independently.
    fn validate_name(&self, label: &str, name: &str, field: &str) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        let length = name.chars().count();
        if !(MIN_NAME_LENGTH..=MAX_NAME_LENGTH).contains(&length) {
            errors.push(ValidationError::new(
                field,
                format!(
                    "{label} name length ({name}) must be between {MIN_NAME_LENGTH} and {MAX_NAME_LENGTH} characters long"
                ),
            ));
        }

        if !self.name.is_match(name) {
            errors.push(ValidationError::new(
                field,
                format!("{label} name ({name}) does not match regex {NAME_PATTERN}"),
            ));
        }

        errors
    }

    fn validate_source(
        &self,
        label: &str,
        name: &str,
        source: &WorkloadSource,
        field: &str,
    ) -> Vec<ValidationError> {
        if source.configured_count() != 1 {
            return vec![ValidationError::new(
                format!("{field}.source"),
                format!("{label} {name} source must be exactly one of git, github, gitlab or image"),
            )];
        }

        let kind = label.to_lowercase();
        let mut errors = Vec::new();

        if let Some(git) = &source.git {
            if git.branch.is_empty() {
                errors.push(ValidationError::new(
                    format!("{field}.git.branch"),
                    format!("Git branch for {name} {kind} cannot be empty"),
                ));
            }
            if git.repo_clone_url.is_empty() {
                errors.push(ValidationError::new(
                    format!("{field}.git.repo_clone_url"),
                    format!("Repo clone URL for {name} {kind} cannot be empty"),
                ));
            }
        }

        if let Some(github) = &source.github {
            errors.extend(self.validate_repo("Github", "github", &github.repo, &github.branch, name, &kind, field));
        }

        if let Some(gitlab) = &source.gitlab {
            errors.extend(self.validate_repo("GitLab", "gitlab", &gitlab.repo, &gitlab.branch, name, &kind, field));
        }

        if let Some(image) = &source.image {
            errors.extend(validate_image(image, name, &kind, field));
        }

        errors
    }

    #[allow(clippy::too_many_arguments)]
    fn validate_repo(
        &self,
        provider: &str,
        key: &str,
        repo: &str,
        branch: &str,
        name: &str,
        kind: &str,
        field: &str,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if branch.is_empty() {
            errors.push(ValidationError::new(
                format!("{field}.{key}.branch"),
                format!("{provider} branch for {name} {kind} cannot be empty"),
            ));
        }

        if !self.repo.is_match(repo) {
            errors.push(ValidationError::new(
                format!("{field}.{key}.repo"),
                format!("{provider} repo for {name} {kind} does not match regex {REPO_PATTERN}"),
            ));
        }

        errors
    }

    fn validate_env_vars(
        &self,
        label: &str,
        name: &str,
        env_vars: &[EnvVarDefinition],
        field: &str,
    ) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for var in env_vars {
            let var_field = format!("{field}[{}]", var.key);

            if !self.env_key.is_match(&var.key) {
                errors.push(ValidationError::new(
                    format!("{var_field}.key"),
                    format!("{label} {name} env key {} does not match regex {ENV_KEY_PATTERN}", var.key),
                ));
            }

            if let Some(scope) = var.scope.as_ref().filter(|s| !s.is_known()) {
                errors.push(ValidationError::new(
                    format!("{var_field}.scope"),
                    format!(
                        "{label} {name} env scope '{scope}' is not valid. Must be one of [{}]",
                        scope_names()
                    ),
                ));
            }

            if let Some(var_type) = var.var_type.as_ref().filter(|t| !t.is_known()) {
                errors.push(ValidationError::new(
                    format!("{var_field}.type"),
                    format!(
                        "{label} {name} env type '{var_type}' is not valid. Must be one of [{}]",
                        type_names()
                    ),
                ));
            }
        }

        errors
    }

    fn validate_instances(&self, label: &str, workload: &Workload, field: &str) -> Vec<ValidationError> {
        let name = &workload.name;
        let mut errors = Vec::new();

        if let Some(count) = workload.instance_count.filter(|n| *n < 0) {
            errors.push(ValidationError::new(
                format!("{field}.instance_count"),
                format!("{label} {name} instance count ({count}) cannot be negative"),
            ));
        }

        if let Some(slug) = &workload.instance_size_slug
            && !self.instance_sizes.contains(slug)
        {
            errors.push(ValidationError::new(
                format!("{field}.instance_size_slug"),
                format!(
                    "{label} {name} instance size slug '{slug}' is not valid. Must be one of [{}]",
                    self.instance_sizes.join(" ")
                ),
            ));
        }

        errors
    }
}

fn validate_image(image: &ImageSource, name: &str, kind: &str, field: &str) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if !image.registry_type.is_known() {
        errors.push(ValidationError::new(
            format!("{field}.image.registry_type"),
            format!("Image registry type for {name} {kind} is invalid"),
        ));
    }

    match image.registry_type {
        RegistryType::Docr if !image.registry.is_empty() => {
            errors.push(ValidationError::new(
                format!("{field}.image.registry"),
                format!("Image registry for {name} {kind} of type DOCR must be empty"),
            ));
        }
        RegistryType::DockerHub if image.registry.is_empty() => {
            errors.push(ValidationError::new(
                format!("{field}.image.registry"),
                format!("Image registry for {name} {kind} of type DOCKER_HUB cannot be empty"),
            ));
        }
        _ => {}
    }

    if image.repository.is_empty() {
        errors.push(ValidationError::new(
            format!("{field}.image.repository"),
            format!("Image repository for {name} {kind} cannot be empty"),
        ));
    }

    errors
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| AppfileError::internal(format!("Invalid validation pattern '{pattern}': {e}")))
}

fn scope_names() -> String {
    super::spec::EnvVarScope::KNOWN.join(" ")
}

fn type_names() -> String {
    super::spec::EnvVarType::KNOWN.join(" ")
}

impl ValidationError {
    /// Creates a finding.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ValidationReport {
    /// Returns true if there are no findings.
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of findings.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the messages in order.
    #[must_use]
    pub fn messages(&self) -> Vec<&str> {
        self.errors.iter().map(|e| e.message.as_str()).collect()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for error in &self.errors {
            writeln!(f, "{}", error.message)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator() -> SpecValidator {
        SpecValidator::new().unwrap()
    }

    fn spec(yaml: &str) -> AppSpecification {
        AppSpecification::from_yaml(yaml, "spec.yaml").unwrap()
    }

    #[test]
    fn test_valid_spec_has_no_findings() {
        let report = validator().validate(&spec(
            "name: sample\nservices:\n  - name: api\n    github:\n      repo: acme/api\n      branch: main\n    \
             instance_count: 1\n    instance_size_slug: basic-xs\n    envs:\n      - key: PORT\n        scope: RUN_TIME\n        type: GENERAL\n",
        ));
        assert!(report.is_valid(), "{report}");
    }

    #[test]
    fn test_empty_name_reports_length_then_pattern() {
        let report = validator().validate(&spec("name: ''\n"));

        assert_eq!(
            report.messages(),
            vec![
                "Spec name length () must be between 2 and 32 characters long",
                "Spec name () does not match regex ^[a-z][a-z0-9-]{0,30}[a-z0-9]$",
            ]
        );
    }

    #[test]
    fn test_name_rules_are_independent() {
        let v = validator();

        let too_long = v.validate(&spec(&format!("name: {}\n", "a".repeat(33))));
        assert_eq!(too_long.error_count(), 2);

        let bad_pattern = v.validate(&spec("name: Sample\n"));
        assert_eq!(
            bad_pattern.messages(),
            vec!["Spec name (Sample) does not match regex ^[a-z][a-z0-9-]{0,30}[a-z0-9]$"]
        );

        assert!(v.validate(&spec("name: ab\n")).is_valid());
        assert_eq!(v.validate(&spec("name: ab-\n")).error_count(), 1);
    }

    #[test]
    fn test_missing_source() {
        let report = validator().validate(&spec("name: sample\nworkers:\n  - name: queue\n"));
        assert_eq!(
            report.messages(),
            vec!["Worker queue source must be exactly one of git, github, gitlab or image"]
        );
    }

    #[test]
    fn test_two_sources_is_one_error_and_skips_field_checks() {
        let report = validator().validate(&spec(
            "name: sample\nservices:\n  - name: api\n    github:\n      repo: bad\n    image:\n      registry_type: NOPE\n",
        ));
        assert_eq!(
            report.messages(),
            vec!["Service api source must be exactly one of git, github, gitlab or image"]
        );
    }

    #[test]
    fn test_git_source_fields() {
        let report = validator().validate(&spec("name: sample\nservices:\n  - name: api\n    git: {}\n"));
        assert_eq!(
            report.messages(),
            vec![
                "Git branch for api service cannot be empty",
                "Repo clone URL for api service cannot be empty",
            ]
        );
    }

    #[test]
    fn test_github_and_gitlab_source_fields() {
        let report = validator().validate(&spec(
            "name: sample\nservices:\n  - name: api\n    github:\n      repo: acme\njobs:\n  - name: migrate\n    gitlab:\n      repo: a/b/c\n      branch: main\n",
        ));
        assert_eq!(
            report.messages(),
            vec![
                "Github branch for api service cannot be empty",
                "Github repo for api service does not match regex ^[^/]+/[^/]+$",
                "GitLab repo for migrate job does not match regex ^[^/]+/[^/]+$",
            ]
        );
    }

    #[test]
    fn test_image_source_fields() {
        let report = validator().validate(&spec(
            "name: sample\nworkers:\n  - name: docr\n    image:\n      registry_type: DOCR\n      registry: mine\n      repository: app\n  \
             - name: hub\n    image:\n      registry_type: DOCKER_HUB\n  - name: other\n    image:\n      registry_type: QUAY\n      repository: app\n",
        ));
        assert_eq!(
            report.messages(),
            vec![
                "Image registry for docr worker of type DOCR must be empty",
                "Image registry for hub worker of type DOCKER_HUB cannot be empty",
                "Image repository for hub worker cannot be empty",
                "Image registry type for other worker is invalid",
            ]
        );
    }

    #[test]
    fn test_env_var_fields() {
        let report = validator().validate(&spec(
            "name: sample\nenvs:\n  - key: 1BAD\nstatic_sites:\n  - name: docs\n    github:\n      repo: a/b\n      branch: main\n    \
             envs:\n      - key: OK\n        scope: SOMETIMES\n        type: PLAIN\n",
        ));
        assert_eq!(
            report.messages(),
            vec![
                "Spec sample env key 1BAD does not match regex ^[_A-Za-z][_A-Za-z0-9]*$",
                "Static site docs env scope 'SOMETIMES' is not valid. Must be one of [RUN_TIME BUILD_TIME RUN_AND_BUILD_TIME]",
                "Static site docs env type 'PLAIN' is not valid. Must be one of [GENERAL SECRET]",
            ]
        );
    }

    #[test]
    fn test_instance_fields() {
        let report = validator().validate(&spec(
            "name: sample\nworkers:\n  - name: queue\n    git:\n      repo_clone_url: https://x/y.git\n      branch: main\n    \
             instance_count: -1\n    instance_size_slug: huge\n",
        ));
        assert_eq!(report.error_count(), 2);
        assert_eq!(report.errors[0].message, "Worker queue instance count (-1) cannot be negative");
        assert!(report.errors[1].message.starts_with(
            "Worker queue instance size slug 'huge' is not valid. Must be one of [basic-xxs basic-xs"
        ));
        assert_eq!(report.errors[1].field, "workers[queue].instance_size_slug");
    }

    #[test]
    fn test_static_sites_skip_instance_rules() {
        let report = validator().validate(&spec(
            "name: sample\nstatic_sites:\n  - name: docs\n    github:\n      repo: a/b\n      branch: main\n    instance_size_slug: huge\n",
        ));
        assert!(report.is_valid());
    }

    #[test]
    fn test_add_instance_size() {
        let mut v = validator();
        let s = spec(
            "name: sample\nworkers:\n  - name: queue\n    git:\n      repo_clone_url: u\n      branch: main\n    instance_size_slug: apps-s-1vcpu-1gb\n",
        );
        assert!(!v.validate(&s).is_valid());

        v.add_instance_size("apps-s-1vcpu-1gb");
        assert!(v.validate(&s).is_valid());
    }

    #[test]
    fn test_findings_follow_declaration_order() {
        let report = validator().validate(&spec(
            "name: x\nservices:\n  - name: a\n  - name: b\n",
        ));
        let fields: Vec<&str> = report.errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            vec![
                "name",
                "name",
                "services[a].name",
                "services[a].name",
                "services[a].source",
                "services[b].name",
                "services[b].name",
                "services[b].source",
            ]
        );
    }
}

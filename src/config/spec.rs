//! App specification types.
//!
//! These types map to the App Platform spec document (`services`, `workers`,
//! `jobs`, `static_sites`). Internally every component is a [`Workload`]
//! kept in one list, in section order, so defaulting and validation
//! dispatch on [`WorkloadKind`].

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{AppfileError, ConfigError, Result};

/// A fully described application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(from = "AppSpecDocument", into = "AppSpecDocument")]
pub struct AppSpecification {
    /// Application name, unique per account.
    pub name: String,
    /// Region slug.
    pub region: Option<String>,
    /// Custom domains.
    pub domains: Vec<DomainBinding>,
    /// App-wide environment variables.
    pub env_vars: Vec<EnvVarDefinition>,
    /// Components in declaration order: services, workers, jobs, static sites.
    pub workloads: Vec<Workload>,
    /// File the spec was rendered from, if any.
    pub source_file: Option<PathBuf>,
    /// Top-level sections without a typed model (`databases`, `ingress`,
    /// `alerts`, ...), carried through unchanged.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A deployable component of an application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workload {
    /// Component name.
    pub name: String,
    /// Kind and kind-specific settings.
    pub kind: WorkloadKind,
    /// Where the code or image comes from.
    pub source: WorkloadSource,
    /// Environment variables.
    pub env_vars: Vec<EnvVarDefinition>,
    /// Number of instances.
    pub instance_count: Option<i64>,
    /// Instance size slug.
    pub instance_size_slug: Option<String>,
    /// HTTP routes.
    pub routes: Vec<RouteSpec>,
    /// Build and run settings.
    pub build: BuildSettings,
    /// Component fields without a typed model, carried through unchanged.
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// Workload kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkloadKind {
    /// Long-running HTTP service.
    Service(ServiceSettings),
    /// Background worker.
    Worker,
    /// One-off job tied to the deployment lifecycle.
    Job(JobSettings),
    /// Static site served from build output.
    StaticSite(StaticSiteSettings),
}

/// Service-only settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ServiceSettings {
    /// Port the service listens on for public HTTP.
    pub http_port: Option<i64>,
    /// Ports reachable only from other components.
    pub internal_ports: Vec<i64>,
    /// Health check.
    pub health_check: Option<HealthCheck>,
}

/// Job-only settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobSettings {
    /// When the job runs.
    pub kind: Option<JobKind>,
}

/// Static-site-only settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StaticSiteSettings {
    /// Build output directory.
    pub output_dir: Option<String>,
    /// Index document.
    pub index_document: Option<String>,
    /// Error document.
    pub error_document: Option<String>,
    /// Catch-all document for single page apps.
    pub catchall_document: Option<String>,
}

/// Build and run settings shared by every workload kind.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BuildSettings {
    /// Build command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_command: Option<String>,
    /// Run command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_command: Option<String>,
    /// Source directory within the repository.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_dir: Option<String>,
    /// Path to a Dockerfile.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dockerfile_path: Option<String>,
    /// Buildpack environment slug.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_slug: Option<String>,
}

/// Workload sources. Exactly one should be set; the validator checks it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WorkloadSource {
    /// Plain git repository.
    pub git: Option<GitSource>,
    /// GitHub repository.
    pub github: Option<GitHubSource>,
    /// GitLab repository.
    pub gitlab: Option<GitLabSource>,
    /// Container image.
    pub image: Option<ImageSource>,
}

/// Plain git source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GitSource {
    /// Branch to deploy.
    #[serde(default)]
    pub branch: String,
    /// Clone URL.
    #[serde(default)]
    pub repo_clone_url: String,
}

/// GitHub source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GitHubSource {
    /// Repository as `owner/repo`.
    #[serde(default)]
    pub repo: String,
    /// Branch to deploy.
    #[serde(default)]
    pub branch: String,
    /// Redeploy on every push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_on_push: Option<bool>,
}

/// GitLab source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GitLabSource {
    /// Repository as `owner/repo`.
    #[serde(default)]
    pub repo: String,
    /// Branch to deploy.
    #[serde(default)]
    pub branch: String,
    /// Redeploy on every push.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deploy_on_push: Option<bool>,
}

/// Container image source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ImageSource {
    /// Registry type.
    #[serde(default, skip_serializing_if = "RegistryType::is_unset")]
    pub registry_type: RegistryType,
    /// Registry name; must be empty for DOCR.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub registry: String,
    /// Repository name.
    #[serde(default)]
    pub repository: String,
    /// Image tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

/// An environment variable definition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EnvVarDefinition {
    /// Variable name.
    pub key: String,
    /// When the variable is available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<EnvVarScope>,
    /// Plain or secret.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub var_type: Option<EnvVarType>,
    /// Value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

/// An HTTP route.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RouteSpec {
    /// Path prefix.
    #[serde(default)]
    pub path: String,
    /// Keep the prefix when forwarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preserve_path_prefix: Option<bool>,
}

/// Service health check.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HealthCheck {
    /// HTTP path to probe; TCP when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_path: Option<String>,
    /// Port to probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<i64>,
    /// Delay before the first probe.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial_delay_seconds: Option<i64>,
    /// Interval between probes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_seconds: Option<i64>,
    /// Probe timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
    /// Successes before healthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_threshold: Option<i64>,
    /// Failures before unhealthy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_threshold: Option<i64>,
}

/// A custom domain bound to the app.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DomainBinding {
    /// Hostname.
    pub domain: String,
    /// `DEFAULT`, `PRIMARY` or `ALIAS`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub domain_type: Option<String>,
    /// Whether the domain includes all subdomains.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wildcard: Option<bool>,
    /// DNS zone managed on the same account.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub zone: Option<String>,
}

// Upper-case string enums that keep unknown values so the validator can
// report them instead of failing the parse.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident { $($(#[$vmeta:meta])* $variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $($(#[$vmeta])* $variant,)+
            /// A value outside the known set.
            Other(String),
        }

        impl $name {
            /// Every known wire value, in declaration order.
            pub const KNOWN: &'static [&'static str] = &[$($text),+];

            /// Returns the wire value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                match self {
                    $(Self::$variant => $text,)+
                    Self::Other(s) => s,
                }
            }

            /// Returns true for values in the known set.
            #[must_use]
            pub const fn is_known(&self) -> bool {
                !matches!(self, Self::Other(_))
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                match s.as_str() {
                    $($text => Self::$variant,)+
                    _ => Self::Other(s),
                }
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::from(s.to_string())
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// When an environment variable is available.
    EnvVarScope {
        /// Only at run time.
        RunTime => "RUN_TIME",
        /// Only at build time.
        BuildTime => "BUILD_TIME",
        /// At build and run time.
        RunAndBuildTime => "RUN_AND_BUILD_TIME",
    }
}

wire_enum! {
    /// Environment variable type.
    EnvVarType {
        /// Plain text.
        General => "GENERAL",
        /// Encrypted at rest.
        Secret => "SECRET",
    }
}

wire_enum! {
    /// Container registry type.
    RegistryType {
        /// DigitalOcean Container Registry.
        Docr => "DOCR",
        /// Docker Hub.
        DockerHub => "DOCKER_HUB",
    }
}

wire_enum! {
    /// When a job runs.
    JobKind {
        /// No lifecycle hook.
        Unspecified => "UNSPECIFIED",
        /// Before every deployment.
        PreDeploy => "PRE_DEPLOY",
        /// After every successful deployment.
        PostDeploy => "POST_DEPLOY",
        /// After a failed deployment.
        FailedDeploy => "FAILED_DEPLOY",
    }
}

impl Default for RegistryType {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl RegistryType {
    /// Returns true when no registry type was given.
    #[must_use]
    pub fn is_unset(&self) -> bool {
        matches!(self, Self::Other(s) if s.is_empty())
    }
}

impl AppSpecification {
    /// Parses a rendered spec document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not a valid app spec.
    pub fn from_yaml(content: &str, location: &str) -> Result<Self> {
        let parse_error = |e: serde_yaml::Error| {
            AppfileError::from(ConfigError::parse(
                format!("Could not parse resulting yaml for app spec: {e}"),
                location,
            ))
        };

        // Merge keys (`<<: *anchor`) are only resolved on the untyped tree
        let mut document: serde_yaml::Value = serde_yaml::from_str(content).map_err(parse_error)?;
        document.apply_merge().map_err(parse_error)?;
        serde_yaml::from_value(document).map_err(parse_error)
    }

    /// Serializes the spec with stable field and section order.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn canonical_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| AppfileError::internal(format!("Could not serialize spec {}: {e}", self.name)))
    }

    /// Sets the file the spec was loaded from.
    #[must_use]
    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Returns the component names.
    #[must_use]
    pub fn workload_names(&self) -> Vec<&str> {
        self.workloads.iter().map(|w| w.name.as_str()).collect()
    }
}

impl WorkloadKind {
    /// Human-readable label used in messages.
    #[must_use]
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Service(_) => "Service",
            Self::Worker => "Worker",
            Self::Job(_) => "Job",
            Self::StaticSite(_) => "Static site",
        }
    }

    /// Spec document section holding this kind.
    #[must_use]
    pub const fn section(&self) -> &'static str {
        match self {
            Self::Service(_) => "services",
            Self::Worker => "workers",
            Self::Job(_) => "jobs",
            Self::StaticSite(_) => "static_sites",
        }
    }

    /// Whether this kind has compute sizing.
    #[must_use]
    pub const fn has_instances(&self) -> bool {
        !matches!(self, Self::StaticSite(_))
    }
}

impl WorkloadSource {
    /// Number of populated source descriptors.
    #[must_use]
    pub fn configured_count(&self) -> usize {
        [
            self.git.is_some(),
            self.github.is_some(),
            self.gitlab.is_some(),
            self.image.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count()
    }
}

impl fmt::Display for WorkloadSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.configured_count() != 1 {
            return f.write_str("-");
        }
        if let Some(git) = &self.git {
            write!(f, "git:{}@{}", git.repo_clone_url, git.branch)
        } else if let Some(gh) = &self.github {
            write!(f, "github:{}@{}", gh.repo, gh.branch)
        } else if let Some(gl) = &self.gitlab {
            write!(f, "gitlab:{}@{}", gl.repo, gl.branch)
        } else if let Some(image) = &self.image {
            write!(f, "image:{}", image.repository)?;
            if let Some(tag) = &image.tag {
                write!(f, ":{tag}")?;
            }
            Ok(())
        } else {
            f.write_str("-")
        }
    }
}

// Wire documents

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AppSpecDocument {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    region: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    domains: Vec<DomainBinding>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    envs: Vec<EnvVarDefinition>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    services: Vec<WorkloadDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    workers: Vec<WorkloadDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    jobs: Vec<WorkloadDocument>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    static_sites: Vec<WorkloadDocument>,
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct WorkloadDocument {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    git: Option<GitSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    github: Option<GitHubSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    gitlab: Option<GitLabSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    image: Option<ImageSource>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    envs: Vec<EnvVarDefinition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instance_count: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    instance_size_slug: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    routes: Vec<RouteSpec>,
    #[serde(flatten)]
    build: BuildSettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    http_port: Option<i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    internal_ports: Vec<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    kind: Option<JobKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    output_dir: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    index_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_document: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    catchall_document: Option<String>,
    // Must stay after `build` so it only collects what `build` leaves behind
    #[serde(flatten)]
    extra: BTreeMap<String, serde_yaml::Value>,
}

impl WorkloadDocument {
    fn into_workload(self, section: &str) -> Workload {
        let kind = match section {
            "services" => WorkloadKind::Service(ServiceSettings {
                http_port: self.http_port,
                internal_ports: self.internal_ports,
                health_check: self.health_check,
            }),
            "jobs" => WorkloadKind::Job(JobSettings { kind: self.kind }),
            "static_sites" => WorkloadKind::StaticSite(StaticSiteSettings {
                output_dir: self.output_dir,
                index_document: self.index_document,
                error_document: self.error_document,
                catchall_document: self.catchall_document,
            }),
            _ => WorkloadKind::Worker,
        };

        Workload {
            name: self.name,
            kind,
            source: WorkloadSource {
                git: self.git,
                github: self.github,
                gitlab: self.gitlab,
                image: self.image,
            },
            env_vars: self.envs,
            instance_count: self.instance_count,
            instance_size_slug: self.instance_size_slug,
            routes: self.routes,
            build: self.build,
            extra: self.extra,
        }
    }
}

impl From<Workload> for WorkloadDocument {
    fn from(w: Workload) -> Self {
        let mut doc = Self {
            name: w.name,
            git: w.source.git,
            github: w.source.github,
            gitlab: w.source.gitlab,
            image: w.source.image,
            envs: w.env_vars,
            instance_count: w.instance_count,
            instance_size_slug: w.instance_size_slug,
            routes: w.routes,
            build: w.build,
            extra: w.extra,
            ..Self::default()
        };

        match w.kind {
            WorkloadKind::Service(s) => {
                doc.http_port = s.http_port;
                doc.internal_ports = s.internal_ports;
                doc.health_check = s.health_check;
            }
            WorkloadKind::Job(j) => doc.kind = j.kind,
            WorkloadKind::StaticSite(s) => {
                doc.output_dir = s.output_dir;
                doc.index_document = s.index_document;
                doc.error_document = s.error_document;
                doc.catchall_document = s.catchall_document;
            }
            WorkloadKind::Worker => {}
        }

        doc
    }
}

impl From<AppSpecDocument> for AppSpecification {
    fn from(doc: AppSpecDocument) -> Self {
        let sections = [
            ("services", doc.services),
            ("workers", doc.workers),
            ("jobs", doc.jobs),
            ("static_sites", doc.static_sites),
        ];

        let workloads = sections
            .into_iter()
            .flat_map(|(section, docs)| docs.into_iter().map(move |d| d.into_workload(section)))
            .collect();

        Self {
            name: doc.name,
            region: doc.region,
            domains: doc.domains,
            env_vars: doc.envs,
            workloads,
            source_file: None,
            extra: doc.extra,
        }
    }
}

impl From<AppSpecification> for AppSpecDocument {
    fn from(spec: AppSpecification) -> Self {
        let mut doc = Self {
            name: spec.name,
            region: spec.region,
            domains: spec.domains,
            envs: spec.env_vars,
            extra: spec.extra,
            ..Self::default()
        };

        for workload in spec.workloads {
            let section = match workload.kind {
                WorkloadKind::Service(_) => &mut doc.services,
                WorkloadKind::Worker => &mut doc.workers,
                WorkloadKind::Job(_) => &mut doc.jobs,
                WorkloadKind::StaticSite(_) => &mut doc.static_sites,
            };
            section.push(WorkloadDocument::from(workload));
        }

        doc
    }
}

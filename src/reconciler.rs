//! Reconciler for converging the remote platform on the appfile.
//!
//! Every run fetches the remote snapshot once, indexes it by app name and
//! then walks the declared apps strictly in declaration order.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::config::{AppSpecification, SpecHasher, SpecValidator, ValidationError, ValidationReport};
use crate::error::{ReconcileError, Result};
use crate::planner::{AppDiff, DiffEngine, ReconciliationOutcome, ReconciliationPlan, RemoteIndex};
use crate::platform::{AppPlatform, DnsRecords, RemoteApp, cleanup_app_domains};

/// Reconciler over a set of declared apps.
pub struct Reconciler<'a, P: AppPlatform + ?Sized> {
    /// Declared apps in declaration order.
    specs: &'a [AppSpecification],
    /// Remote platform.
    platform: &'a P,
    /// DNS cleanup hook used on destroy.
    dns: Option<&'a dyn DnsRecords>,
    /// Diff engine.
    diff_engine: DiffEngine,
}

/// Result of syncing one app.
#[derive(Debug, Clone, Serialize)]
pub struct SyncedApp {
    /// App name.
    pub name: String,
    /// What was done.
    pub outcome: ReconciliationOutcome,
    /// Remote app identifier after the sync.
    pub app_id: String,
    /// Default ingress URL, if already assigned.
    pub live_url: Option<String>,
    /// Custom domains declared for the app.
    pub domains: Vec<String>,
}

/// Result of a sync run.
#[derive(Debug, Serialize)]
pub struct SyncReport {
    /// Apps in the order they were synced.
    pub apps: Vec<SyncedApp>,
}

/// Result of a destroy run.
#[derive(Debug, Serialize)]
pub struct DestroyReport {
    /// Apps destroyed, in order.
    pub destroyed: Vec<String>,
    /// DNS records removed by the cleanup hook.
    pub dns_records_deleted: usize,
}

/// Deployment status of an app.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// The app is absent remotely or has no deployment.
    Unknown,
    /// A deployment is rolling out.
    InProgress,
    /// The active deployment is live.
    Deployed,
}

/// Status of one declared app.
#[derive(Debug, Clone, Serialize)]
pub struct AppStatus {
    /// App name.
    pub name: String,
    /// Deployment status.
    pub status: DeploymentStatus,
    /// Deployment the status was derived from.
    pub deployment_id: Option<String>,
    /// Last update time.
    pub updated_at: Option<DateTime<Utc>>,
    /// Public URL.
    pub url: Option<String>,
}

/// Summary of one component of an app.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentSummary {
    /// Component kind label.
    pub kind: String,
    /// Component name.
    pub name: String,
    /// Source descriptor.
    pub source: String,
    /// Instance count, if the kind runs instances.
    pub instances: Option<i64>,
    /// Instance size slug.
    pub size: Option<String>,
    /// Short fingerprint of the component.
    pub fingerprint: String,
}

impl<'a, P: AppPlatform + ?Sized> Reconciler<'a, P> {
    /// Creates a new reconciler.
    #[must_use]
    pub const fn new(specs: &'a [AppSpecification], platform: &'a P) -> Self {
        Self {
            specs,
            platform,
            dns: None,
            diff_engine: DiffEngine::new(),
        }
    }

    /// Enables DNS record cleanup for destroyed apps.
    #[must_use]
    pub const fn with_dns_cleanup(mut self, dns: &'a dyn DnsRecords) -> Self {
        self.dns = Some(dns);
        self
    }

    /// Fetches and indexes the remote snapshot.
    async fn remote_index(&self) -> Result<RemoteIndex> {
        debug!("Get apps running in DigitalOcean");
        let apps = self.platform.list_apps().await?;
        debug!("Found {} remote apps", apps.len());
        Ok(RemoteIndex::new(apps))
    }

    /// Creates absent apps and updates present ones.
    ///
    /// Present apps are always updated, even when nothing changed.
    ///
    /// # Errors
    ///
    /// Returns the first platform error; apps synced before it stay synced.
    pub async fn sync(&self) -> Result<SyncReport> {
        let remote = self.remote_index().await?;
        let plan = ReconciliationPlan::for_sync(self.specs, &remote);
        debug!("{plan}");

        let mut apps = Vec::with_capacity(plan.actions.len());
        for (spec, action) in self.specs.iter().zip(plan.actions) {
            info!("Syncing app {}", spec.name);
            debug!("Components: {}", spec.workload_names().join(", "));

            let app = match &action.outcome {
                ReconciliationOutcome::Update { app_id } => {
                    self.platform.update_app(app_id, spec).await?
                }
                _ => self.platform.create_app(spec).await?,
            };
            info!("App {} synced successfully", spec.name);

            let domains: Vec<String> = spec.domains.iter().map(|d| d.domain.clone()).collect();
            for domain in &domains {
                info!("App {} will be reachable at {domain}", spec.name);
            }

            apps.push(SyncedApp {
                name: spec.name.clone(),
                outcome: action.outcome,
                app_id: app.id,
                live_url: app.live_url,
                domains,
            });
        }

        Ok(SyncReport { apps })
    }

    /// Destroys every declared app.
    ///
    /// Nothing is deleted unless every declared app exists remotely.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::MissingRemoteApp`] before any deletion, or
    /// [`ReconcileError::DeletionFailed`] naming the apps already deleted.
    pub async fn destroy(&self) -> Result<DestroyReport> {
        let remote = self.remote_index().await?;
        let plan = ReconciliationPlan::for_destroy(self.specs, &remote);

        if let Some(blocked) = plan.first_blocked() {
            return Err(ReconcileError::MissingRemoteApp {
                name: blocked.app.clone(),
            }
            .into());
        }

        let mut report = DestroyReport {
            destroyed: Vec::new(),
            dns_records_deleted: 0,
        };

        for action in &plan.actions {
            let ReconciliationOutcome::Destroy { app_id } = &action.outcome else {
                continue;
            };

            debug!("Destroying app {}", action.app);
            if let Err(e) = self.platform.delete_app(app_id).await {
                return Err(ReconcileError::DeletionFailed {
                    name: action.app.clone(),
                    destroyed: report.destroyed,
                    reason: e.to_string(),
                }
                .into());
            }
            info!("App {} destroyed successfully", action.app);
            report.destroyed.push(action.app.clone());

            if let (Some(dns), Some(app)) = (self.dns, remote.get(&action.app)) {
                report.dns_records_deleted += cleanup_app_domains(dns, &app.spec).await?;
            }
        }

        Ok(report)
    }

    /// Reports the deployment status of every declared app.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote snapshot cannot be fetched.
    pub async fn status(&self) -> Result<Vec<AppStatus>> {
        let remote = self.remote_index().await?;

        Ok(self
            .specs
            .iter()
            .map(|spec| match remote.get(&spec.name) {
                Some(app) => AppStatus::from_remote(app),
                None => {
                    warn!("{} app not found in App Platform", spec.name);
                    AppStatus::unknown(&spec.name)
                }
            })
            .collect())
    }

    /// Diffs every declared app against its remote counterpart.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote snapshot cannot be fetched.
    pub async fn diff(&self) -> Result<Vec<AppDiff>> {
        let remote = self.remote_index().await?;

        self.specs
            .iter()
            .map(|spec| {
                let remote_spec = remote.get(&spec.name).map(|app| &app.spec);
                self.diff_engine.diff_app(spec, remote_spec)
            })
            .collect()
    }

    /// Validates every declared app and dry-runs the clean ones remotely.
    ///
    /// A remote rejection is appended to the app's report.
    ///
    /// # Errors
    ///
    /// Returns an error if the remote snapshot cannot be fetched.
    pub async fn lint(&self, validator: &SpecValidator) -> Result<Vec<ValidationReport>> {
        let remote = self.remote_index().await?;

        let mut reports = Vec::with_capacity(self.specs.len());
        for spec in self.specs {
            let mut report = validator.validate(spec);

            if report.is_valid() {
                let app_id = remote.get(&spec.name).map(|app| app.id.clone());
                if let Err(e) = self.platform.propose_app(spec, app_id).await {
                    debug!("App {} rejected by propose: {e}", spec.name);
                    report.errors.push(ValidationError::new("propose", e.to_string()));
                }
            }

            reports.push(report);
        }

        Ok(reports)
    }
}

impl ComponentSummary {
    /// Summarizes the components of the declared app called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::UnknownApp`] if no declared app has that name.
    pub fn for_app(specs: &[AppSpecification], name: &str) -> Result<Vec<Self>> {
        let spec = specs
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ReconcileError::UnknownApp {
                name: name.to_string(),
            })?;

        let hasher = SpecHasher::new();
        Ok(spec
            .workloads
            .iter()
            .map(|w| Self {
                kind: w.kind.label().to_string(),
                name: w.name.clone(),
                source: w.source.to_string(),
                instances: w.kind.has_instances().then_some(w.instance_count).flatten(),
                size: w.instance_size_slug.clone(),
                fingerprint: hasher.short_hash(&hasher.hash_workload(w)),
            })
            .collect())
    }
}

impl AppStatus {
    fn unknown(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: DeploymentStatus::Unknown,
            deployment_id: None,
            updated_at: None,
            url: None,
        }
    }

    fn from_remote(app: &RemoteApp) -> Self {
        let (status, deployment) = match (&app.in_progress_deployment, &app.active_deployment) {
            (Some(d), _) => (DeploymentStatus::InProgress, d),
            (None, Some(d)) => (DeploymentStatus::Deployed, d),
            (None, None) => return Self::unknown(app.name()),
        };

        Self {
            name: app.name().to_string(),
            status,
            deployment_id: Some(deployment.id.clone()),
            updated_at: app.updated_at,
            url: app.live_url.clone().or_else(|| app.live_domain.clone()),
        }
    }
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unknown => "unknown",
            Self::InProgress => "in progress",
            Self::Deployed => "deployed",
        };
        write!(f, "{s}")
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::{always, eq};
    use tokio_test::{assert_err, assert_ok};

    use super::*;
    use crate::config::DomainBinding;
    use crate::error::{AppfileError, PlatformError};
    use crate::platform::{Deployment, DomainRecord, MockAppPlatform, MockDnsRecords};

    fn spec(name: &str) -> AppSpecification {
        AppSpecification {
            name: name.to_string(),
            ..AppSpecification::default()
        }
    }

    fn remote(id: &str, name: &str) -> RemoteApp {
        RemoteApp::new(id, spec(name))
    }

    #[tokio::test]
    async fn test_sync_creates_and_always_updates() {
        let specs = vec![spec("web"), spec("api")];
        let mut platform = MockAppPlatform::new();
        platform
            .expect_list_apps()
            .times(1)
            .returning(|| Ok(vec![remote("id-api", "api")]));
        platform
            .expect_create_app()
            .withf(|s| s.name == "web")
            .times(1)
            .returning(|s| Ok(RemoteApp::new("id-web", s.clone())));
        platform
            .expect_update_app()
            .with(eq("id-api"), always())
            .times(1)
            .returning(|id, s| Ok(RemoteApp::new(id, s.clone())));

        let report = assert_ok!(Reconciler::new(&specs, &platform).sync().await);

        assert_eq!(report.apps[0].outcome, ReconciliationOutcome::Create);
        assert_eq!(report.apps[0].app_id, "id-web");
        assert_eq!(
            report.apps[1].outcome,
            ReconciliationOutcome::Update {
                app_id: String::from("id-api")
            }
        );
    }

    #[tokio::test]
    async fn test_sync_stops_at_first_failure() {
        let specs = vec![spec("web"), spec("api")];
        let mut platform = MockAppPlatform::new();
        platform.expect_list_apps().returning(|| Ok(vec![]));
        platform
            .expect_create_app()
            .times(1)
            .returning(|_| Err(PlatformError::api_error(422, "bad spec").into()));

        assert_err!(Reconciler::new(&specs, &platform).sync().await);
    }

    #[tokio::test]
    async fn test_destroy_with_missing_app_deletes_nothing() {
        let specs = vec![spec("web"), spec("api"), spec("jobs")];
        let mut platform = MockAppPlatform::new();
        platform
            .expect_list_apps()
            .returning(|| Ok(vec![remote("1", "web"), remote("3", "jobs")]));
        platform.expect_delete_app().never();

        let err = assert_err!(Reconciler::new(&specs, &platform).destroy().await);

        assert!(matches!(
            err,
            AppfileError::Reconcile(ReconcileError::MissingRemoteApp { ref name }) if name == "api"
        ));
        assert_eq!(err.to_string(), "Reconciliation error: No app to destroy with name api");
    }

    #[tokio::test]
    async fn test_destroy_failure_lists_deleted_apps() {
        let specs = vec![spec("web"), spec("api"), spec("jobs")];
        let mut platform = MockAppPlatform::new();
        platform.expect_list_apps().returning(|| {
            Ok(vec![remote("1", "web"), remote("2", "api"), remote("3", "jobs")])
        });
        platform
            .expect_delete_app()
            .with(eq("1"))
            .times(1)
            .returning(|_| Ok(()));
        platform
            .expect_delete_app()
            .with(eq("2"))
            .times(1)
            .returning(|_| Err(PlatformError::network("connection reset").into()));
        platform.expect_delete_app().with(eq("3")).never();

        let err = assert_err!(Reconciler::new(&specs, &platform).destroy().await);

        match err {
            AppfileError::Reconcile(ReconcileError::DeletionFailed { name, destroyed, .. }) => {
                assert_eq!(name, "api");
                assert_eq!(destroyed, vec![String::from("web")]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_destroy_cleans_up_remote_domains() {
        let specs = vec![spec("web")];
        let mut platform = MockAppPlatform::new();
        platform.expect_list_apps().returning(|| {
            let mut app = remote("1", "web");
            app.spec.domains = vec![DomainBinding {
                domain: String::from("web.example.com"),
                zone: Some(String::from("example.com")),
                ..DomainBinding::default()
            }];
            Ok(vec![app])
        });
        platform.expect_delete_app().times(1).returning(|_| Ok(()));

        let mut dns = MockDnsRecords::new();
        dns.expect_cname_records()
            .with(eq("example.com"), eq("web.example.com"))
            .returning(|_, _| {
                Ok(vec![DomainRecord {
                    id: 9,
                    record_type: String::from("CNAME"),
                    name: String::from("web"),
                    data: String::from("web.ondigitalocean.app."),
                }])
            });
        dns.expect_delete_record()
            .with(eq("example.com"), eq(9_u64))
            .times(1)
            .returning(|_, _| Ok(()));

        let report = assert_ok!(
            Reconciler::new(&specs, &platform)
                .with_dns_cleanup(&dns)
                .destroy()
                .await
        );

        assert_eq!(report.destroyed, vec![String::from("web")]);
        assert_eq!(report.dns_records_deleted, 1);
    }

    #[tokio::test]
    async fn test_status_prefers_in_progress_deployment() {
        let specs = vec![spec("web"), spec("api"), spec("jobs")];
        let mut platform = MockAppPlatform::new();
        platform.expect_list_apps().returning(|| {
            let mut web = remote("1", "web");
            web.active_deployment = Some(Deployment {
                id: String::from("dep-1"),
                phase: None,
            });
            web.in_progress_deployment = Some(Deployment {
                id: String::from("dep-2"),
                phase: None,
            });
            web.live_url = Some(String::from("https://web.example.com"));

            let mut api = remote("2", "api");
            api.active_deployment = Some(Deployment {
                id: String::from("dep-3"),
                phase: None,
            });
            Ok(vec![web, api])
        });

        let statuses = assert_ok!(Reconciler::new(&specs, &platform).status().await);

        assert_eq!(statuses[0].status, DeploymentStatus::InProgress);
        assert_eq!(statuses[0].deployment_id.as_deref(), Some("dep-2"));
        assert_eq!(statuses[0].url.as_deref(), Some("https://web.example.com"));
        assert_eq!(statuses[1].status, DeploymentStatus::Deployed);
        assert_eq!(statuses[2].status, DeploymentStatus::Unknown);
        assert_eq!(statuses[2].status.to_string(), "unknown");
        assert!(statuses[2].deployment_id.is_none());
    }

    #[tokio::test]
    async fn test_diff_uses_empty_remote_for_new_apps() {
        let specs = vec![spec("web")];
        let mut platform = MockAppPlatform::new();
        platform.expect_list_apps().returning(|| Ok(vec![]));

        let diffs = assert_ok!(Reconciler::new(&specs, &platform).diff().await);

        assert_eq!(diffs.len(), 1);
        assert!(diffs[0].is_new());
    }

    #[tokio::test]
    async fn test_lint_proposes_only_clean_specs() {
        let specs = vec![spec("x"), spec("web")];
        let mut platform = MockAppPlatform::new();
        platform
            .expect_list_apps()
            .returning(|| Ok(vec![remote("id-web", "web")]));
        platform
            .expect_propose_app()
            .withf(|s, id| s.name == "web" && id.as_deref() == Some("id-web"))
            .times(1)
            .returning(|_, _| Err(PlatformError::api_error(400, "invalid region").into()));

        let validator = SpecValidator::new().unwrap();
        let reports = assert_ok!(Reconciler::new(&specs, &platform).lint(&validator).await);

        assert_eq!(reports[0].error_count(), 2);
        assert_eq!(reports[1].error_count(), 1);
        assert_eq!(reports[1].errors[0].field, "propose");
        assert!(reports[1].errors[0].message.contains("invalid region"));
    }

    #[test]
    fn test_components_of_declared_app() {
        let yaml = "name: web\nservices:\n- name: api\n  image:\n    registry_type: DOCR\n    repository: api\n";
        let specs = vec![AppSpecification::from_yaml(yaml, "web.yaml").unwrap().with_defaults()];

        let components = ComponentSummary::for_app(&specs, "web").unwrap();

        assert_eq!(components.len(), 1);
        assert_eq!(components[0].kind, "Service");
        assert_eq!(components[0].source, "image:api");
        assert_eq!(components[0].instances, Some(1));
        assert_eq!(components[0].fingerprint.len(), 8);
        assert!(matches!(
            ComponentSummary::for_app(&specs, "api"),
            Err(AppfileError::Reconcile(ReconcileError::UnknownApp { .. }))
        ));
    }
}

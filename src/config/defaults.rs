//! Default-value population for loaded specs.

use tracing::debug;

use super::spec::{
    AppSpecification, EnvVarDefinition, EnvVarScope, EnvVarType, JobKind, RouteSpec, Workload,
    WorkloadKind,
};

/// Instance size used when none is given.
pub const DEFAULT_INSTANCE_SIZE: &str = "basic-xxs";

/// Instance count used when none (or zero) is given.
pub const DEFAULT_INSTANCE_COUNT: i64 = 1;

/// Path of the route synthesized for routable workloads.
pub const DEFAULT_ROUTE_PATH: &str = "/";

impl AppSpecification {
    /// Fills in unset fields and returns the completed spec.
    ///
    /// - env var scope `RUN_AND_BUILD_TIME`, type `GENERAL`
    /// - instance count 1 and size `basic-xxs` for every kind but static sites
    /// - job kind `POST_DEPLOY`
    /// - a `/` route for services without internal ports or routes, and for
    ///   static sites without routes
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        debug!("Setting default values for {} spec", self.name);

        for workload in &mut self.workloads {
            apply_workload_defaults(workload);
        }

        self
    }
}

fn apply_workload_defaults(workload: &mut Workload) {
    apply_env_defaults(&mut workload.env_vars);

    if workload.kind.has_instances() {
        if workload.instance_count.is_none_or(|n| n == 0) {
            workload.instance_count = Some(DEFAULT_INSTANCE_COUNT);
        }
        if workload.instance_size_slug.as_deref().is_none_or(str::is_empty) {
            workload.instance_size_slug = Some(DEFAULT_INSTANCE_SIZE.to_string());
        }
    }

    let needs_route = match &mut workload.kind {
        WorkloadKind::Service(settings) => settings.internal_ports.is_empty(),
        WorkloadKind::StaticSite(_) => true,
        WorkloadKind::Job(settings) => {
            settings.kind.get_or_insert(JobKind::PostDeploy);
            false
        }
        WorkloadKind::Worker => false,
    };

    if needs_route && workload.routes.is_empty() {
        workload.routes.push(RouteSpec {
            path: DEFAULT_ROUTE_PATH.to_string(),
            preserve_path_prefix: None,
        });
    }
}

fn apply_env_defaults(env_vars: &mut [EnvVarDefinition]) {
    for var in env_vars {
        var.scope.get_or_insert(EnvVarScope::RunAndBuildTime);
        var.var_type.get_or_insert(EnvVarType::General);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load(yaml: &str) -> AppSpecification {
        AppSpecification::from_yaml(yaml, "spec.yaml").unwrap().with_defaults()
    }

    #[test]
    fn test_service_defaults() {
        let spec = load("name: app\nservices:\n  - name: api\n    envs:\n      - key: A\n");
        let api = &spec.workloads[0];

        assert_eq!(api.instance_count, Some(1));
        assert_eq!(api.instance_size_slug.as_deref(), Some("basic-xxs"));
        assert_eq!(api.routes, vec![RouteSpec { path: String::from("/"), preserve_path_prefix: None }]);
        assert_eq!(api.env_vars[0].scope, Some(EnvVarScope::RunAndBuildTime));
        assert_eq!(api.env_vars[0].var_type, Some(EnvVarType::General));
    }

    #[test]
    fn test_explicit_values_are_kept() {
        let spec = load(
            "name: app\nservices:\n  - name: api\n    instance_count: 3\n    instance_size_slug: basic-s\n    \
             routes:\n      - path: /api\n    envs:\n      - key: A\n        scope: BUILD_TIME\n        type: SECRET\n",
        );
        let api = &spec.workloads[0];

        assert_eq!(api.instance_count, Some(3));
        assert_eq!(api.instance_size_slug.as_deref(), Some("basic-s"));
        assert_eq!(api.routes.len(), 1);
        assert_eq!(api.routes[0].path, "/api");
        assert_eq!(api.env_vars[0].scope, Some(EnvVarScope::BuildTime));
        assert_eq!(api.env_vars[0].var_type, Some(EnvVarType::Secret));
    }

    #[test]
    fn test_zero_instance_count_becomes_one() {
        let spec = load("name: app\nworkers:\n  - name: queue\n    instance_count: 0\n");
        assert_eq!(spec.workloads[0].instance_count, Some(1));
    }

    #[test]
    fn test_internal_ports_suppress_default_route() {
        let spec = load("name: app\nservices:\n  - name: api\n    internal_ports: [8080]\n");
        assert!(spec.workloads[0].routes.is_empty());
    }

    #[test]
    fn test_job_and_worker_defaults() {
        let spec = load("name: app\nworkers:\n  - name: queue\njobs:\n  - name: migrate\n");

        let queue = &spec.workloads[0];
        assert!(queue.routes.is_empty());
        assert_eq!(queue.instance_count, Some(1));

        let migrate = &spec.workloads[1];
        assert_eq!(
            migrate.kind,
            WorkloadKind::Job(crate::config::JobSettings { kind: Some(JobKind::PostDeploy) })
        );
        assert!(migrate.routes.is_empty());
    }

    #[test]
    fn test_static_site_gets_route_but_no_sizing() {
        let spec = load("name: app\nstatic_sites:\n  - name: docs\n");
        let docs = &spec.workloads[0];

        assert_eq!(docs.routes[0].path, "/");
        assert_eq!(docs.instance_count, None);
        assert_eq!(docs.instance_size_slug, None);
    }

    #[test]
    fn test_defaults_are_idempotent() {
        let once = load("name: app\nservices:\n  - name: api\njobs:\n  - name: migrate\n");
        let twice = once.clone().with_defaults();
        assert_eq!(once, twice);
    }
}

//! Reconciliation plan types and construction.
//!
//! A plan maps every declared app, in declaration order, to the action a
//! sync or destroy run will take against the remote snapshot.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::AppSpecification;
use crate::platform::RemoteApp;

/// Remote apps indexed by name. Built once per run.
#[derive(Debug, Default)]
pub struct RemoteIndex {
    apps: HashMap<String, RemoteApp>,
}

impl RemoteIndex {
    /// Indexes a remote snapshot by app name.
    #[must_use]
    pub fn new(apps: Vec<RemoteApp>) -> Self {
        Self {
            apps: apps
                .into_iter()
                .map(|app| (app.name().to_string(), app))
                .collect(),
        }
    }

    /// Looks up an app by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RemoteApp> {
        self.apps.get(name)
    }

    /// Returns the number of indexed apps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// Returns true if the remote snapshot is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

/// What will happen to one app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ReconciliationOutcome {
    /// The app does not exist remotely and will be created.
    Create,
    /// The app exists and its spec will be replaced.
    Update {
        /// Remote app identifier.
        app_id: String,
    },
    /// The app exists and will be deleted.
    Destroy {
        /// Remote app identifier.
        app_id: String,
    },
    /// The app cannot be destroyed.
    DestroyBlocked {
        /// Why the destroy is refused.
        reason: String,
    },
}

/// A single planned action.
#[derive(Debug, Clone, Serialize)]
pub struct PlannedAction {
    /// App name.
    pub app: String,
    /// Outcome for the app.
    #[serde(flatten)]
    pub outcome: ReconciliationOutcome,
}

/// An ordered reconciliation plan.
#[derive(Debug, Serialize)]
pub struct ReconciliationPlan {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Actions in declaration order.
    pub actions: Vec<PlannedAction>,
}

impl ReconciliationPlan {
    /// Plans a sync: create absent apps, update present ones.
    ///
    /// Updates are planned even when the remote spec is already identical.
    #[must_use]
    pub fn for_sync(specs: &[AppSpecification], remote: &RemoteIndex) -> Self {
        let actions = specs
            .iter()
            .map(|spec| PlannedAction {
                app: spec.name.clone(),
                outcome: remote.get(&spec.name).map_or(
                    ReconciliationOutcome::Create,
                    |app| ReconciliationOutcome::Update {
                        app_id: app.id.clone(),
                    },
                ),
            })
            .collect();

        Self {
            created_at: Utc::now(),
            actions,
        }
    }

    /// Plans a destroy: every absent app blocks the whole run.
    #[must_use]
    pub fn for_destroy(specs: &[AppSpecification], remote: &RemoteIndex) -> Self {
        let actions = specs
            .iter()
            .map(|spec| PlannedAction {
                app: spec.name.clone(),
                outcome: remote.get(&spec.name).map_or_else(
                    || ReconciliationOutcome::DestroyBlocked {
                        reason: format!("No app to destroy with name {}", spec.name),
                    },
                    |app| ReconciliationOutcome::Destroy {
                        app_id: app.id.clone(),
                    },
                ),
            })
            .collect();

        Self {
            created_at: Utc::now(),
            actions,
        }
    }

    /// Returns true if the plan has no actions.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Returns the first blocked action, if any.
    #[must_use]
    pub fn first_blocked(&self) -> Option<&PlannedAction> {
        self.actions
            .iter()
            .find(|a| matches!(a.outcome, ReconciliationOutcome::DestroyBlocked { .. }))
    }

    /// Returns the number of create actions.
    #[must_use]
    pub fn create_count(&self) -> usize {
        self.count(|o| matches!(o, ReconciliationOutcome::Create))
    }

    /// Returns the number of update actions.
    #[must_use]
    pub fn update_count(&self) -> usize {
        self.count(|o| matches!(o, ReconciliationOutcome::Update { .. }))
    }

    /// Returns the number of destroy actions.
    #[must_use]
    pub fn destroy_count(&self) -> usize {
        self.count(|o| matches!(o, ReconciliationOutcome::Destroy { .. }))
    }

    fn count(&self, predicate: impl Fn(&ReconciliationOutcome) -> bool) -> usize {
        self.actions.iter().filter(|a| predicate(&a.outcome)).count()
    }
}

impl fmt::Display for ReconciliationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update { .. } => write!(f, "update"),
            Self::Destroy { .. } => write!(f, "destroy"),
            Self::DestroyBlocked { .. } => write!(f, "blocked"),
        }
    }
}

impl fmt::Display for PlannedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.outcome, self.app)?;
        match &self.outcome {
            ReconciliationOutcome::Update { app_id } | ReconciliationOutcome::Destroy { app_id } => {
                write!(f, " ({app_id})")
            }
            ReconciliationOutcome::DestroyBlocked { reason } => write!(f, " ({reason})"),
            ReconciliationOutcome::Create => Ok(()),
        }
    }
}

impl fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.actions.is_empty() {
            return write!(f, "No apps declared");
        }

        writeln!(f, "Reconciliation Plan ({} actions):", self.actions.len())?;
        for (i, action) in self.actions.iter().enumerate() {
            writeln!(f, "  {i}. {action}")?;
        }
        Ok(())
    }
}

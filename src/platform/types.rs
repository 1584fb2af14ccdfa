//! App Platform API types and data structures.
//!
//! This module defines the types used for communication with the
//! DigitalOcean API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AppSpecification;

/// An app as reported by the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RemoteApp {
    /// Unique app identifier.
    pub id: String,
    /// Currently stored spec.
    #[serde(default)]
    pub spec: AppSpecification,
    /// Last successful deployment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_deployment: Option<Deployment>,
    /// Deployment currently rolling out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_progress_deployment: Option<Deployment>,
    /// Last update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Default ingress hostname.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_domain: Option<String>,
    /// Default ingress URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_url: Option<String>,
}

/// A deployment pointer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Deployment {
    /// Deployment identifier.
    pub id: String,
    /// Deployment phase, e.g. `ACTIVE` or `BUILDING`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,
}

/// A DNS record in a managed zone.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DomainRecord {
    /// Record identifier.
    pub id: u64,
    /// Record type, e.g. `CNAME`.
    #[serde(rename = "type")]
    pub record_type: String,
    /// Record name relative to the zone.
    pub name: String,
    /// Record target.
    #[serde(default)]
    pub data: String,
}

impl RemoteApp {
    /// Creates a remote app with no deployments.
    #[must_use]
    pub fn new(id: impl Into<String>, spec: AppSpecification) -> Self {
        Self {
            id: id.into(),
            spec,
            active_deployment: None,
            in_progress_deployment: None,
            updated_at: None,
            live_domain: None,
            live_url: None,
        }
    }

    /// Returns the app name from its stored spec.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.spec.name
    }
}

/// Body of create, update and propose requests.
#[derive(Debug, Serialize)]
pub(crate) struct SpecRequest<'a> {
    pub spec: &'a AppSpecification,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub app_id: Option<&'a str>,
}

/// Response wrapping a single app.
#[derive(Debug, Deserialize)]
pub(crate) struct AppResponse {
    pub app: RemoteApp,
}

/// One page of apps.
#[derive(Debug, Deserialize)]
pub(crate) struct ListAppsResponse {
    #[serde(default)]
    pub apps: Vec<RemoteApp>,
    #[serde(default)]
    pub links: Option<Links>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Links {
    #[serde(default)]
    pub pages: Option<Pages>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Pages {
    #[serde(default)]
    pub next: Option<String>,
}

impl ListAppsResponse {
    /// URL of the next page, if any.
    pub fn next_page(&self) -> Option<&str> {
        self.links
            .as_ref()
            .and_then(|l| l.pages.as_ref())
            .and_then(|p| p.next.as_deref())
    }
}

/// Domain record listing.
#[derive(Debug, Deserialize)]
pub(crate) struct DomainRecordsResponse {
    #[serde(default)]
    pub domain_records: Vec<DomainRecord>,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiErrorBody {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub message: String,
}

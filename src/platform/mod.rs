//! Remote platform integration module.
//!
//! This module defines the collaborators the reconciler talks to and
//! provides the DigitalOcean implementation of both.

mod client;
mod domains;
mod types;

use async_trait::async_trait;

use crate::config::AppSpecification;
use crate::error::Result;

pub use client::{DIGITALOCEAN_API_URL, DigitalOceanClient};
pub use domains::{cleanup_app_domains, delete_domain_record};
pub use types::{Deployment, DomainRecord, RemoteApp};

/// Operations on hosted apps.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AppPlatform: Send + Sync {
    /// Lists every app on the account.
    async fn list_apps(&self) -> Result<Vec<RemoteApp>>;

    /// Creates an app from a spec.
    async fn create_app(&self, spec: &AppSpecification) -> Result<RemoteApp>;

    /// Replaces the spec of an existing app.
    async fn update_app(&self, app_id: &str, spec: &AppSpecification) -> Result<RemoteApp>;

    /// Deletes an app.
    async fn delete_app(&self, app_id: &str) -> Result<()>;

    /// Dry-runs a spec against the platform. An error means the platform
    /// would reject it.
    async fn propose_app(&self, spec: &AppSpecification, app_id: Option<String>) -> Result<()>;
}

/// Operations on DNS records of managed zones.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DnsRecords: Send + Sync {
    /// Lists the CNAME records named `name` in `zone`.
    async fn cname_records(&self, zone: &str, name: &str) -> Result<Vec<DomainRecord>>;

    /// Deletes a record from `zone`.
    async fn delete_record(&self, zone: &str, record_id: u64) -> Result<()>;
}

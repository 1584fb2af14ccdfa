//! Removal of DNS records that pointed at destroyed apps.

use tracing::{debug, info, warn};

use crate::config::{AppSpecification, DomainBinding};
use crate::error::{PlatformError, Result};

use super::DnsRecords;

/// Deletes the CNAME record of one custom domain.
///
/// Domains without a zone are skipped. Returns whether a record was deleted;
/// a missing record is only a warning.
///
/// # Errors
///
/// Returns an error if the lookup or deletion fails, or if more than one
/// record matches.
pub async fn delete_domain_record<D: DnsRecords + ?Sized>(
    dns: &D,
    binding: &DomainBinding,
) -> Result<bool> {
    let Some(zone) = binding.zone.as_deref().filter(|z| !z.is_empty()) else {
        return Ok(false);
    };
    if binding.domain.is_empty() {
        return Ok(false);
    }

    debug!("Deleting {} hostname in {zone} zone", binding.domain);

    let records = dns.cname_records(zone, &binding.domain).await?;

    match records.as_slice() {
        [] => {
            warn!("{} CNAME record not found", binding.domain);
            Ok(false)
        }
        [record] => {
            dns.delete_record(zone, record.id).await?;
            info!("{} hostname deleted successfully from {zone} zone", binding.domain);
            Ok(true)
        }
        _ => Err(PlatformError::DuplicateRecord {
            domain: binding.domain.clone(),
        }
        .into()),
    }
}

/// Deletes the CNAME records of every custom domain of an app.
///
/// # Errors
///
/// Returns the first error from [`delete_domain_record`].
pub async fn cleanup_app_domains<D: DnsRecords + ?Sized>(
    dns: &D,
    spec: &AppSpecification,
) -> Result<usize> {
    let mut deleted = 0;
    for binding in &spec.domains {
        if delete_domain_record(dns, binding).await? {
            deleted += 1;
        }
    }
    Ok(deleted)
}

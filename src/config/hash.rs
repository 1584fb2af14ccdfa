//! Spec fingerprints for change detection.
//!
//! A fingerprint is the SHA-256 of a spec's canonical serialization, so two
//! specs that serialize identically always share a fingerprint.

use sha2::{Digest, Sha256};

use crate::error::Result;

use super::spec::{AppSpecification, Workload};

/// Hasher for computing spec fingerprints.
#[derive(Debug, Default)]
pub struct SpecHasher;

impl SpecHasher {
    /// Creates a new spec hasher.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fingerprints a whole spec.
    ///
    /// # Errors
    ///
    /// Returns an error if the spec cannot be serialized.
    pub fn hash_spec(&self, spec: &AppSpecification) -> Result<String> {
        Ok(self.hash_text(&spec.canonical_yaml()?))
    }

    /// Fingerprints an already serialized spec.
    #[must_use]
    pub fn hash_text(&self, canonical: &str) -> String {
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    /// Fingerprints a single workload by its identity, source and sizing.
    #[must_use]
    pub fn hash_workload(&self, workload: &Workload) -> String {
        let mut hasher = Sha256::new();

        hasher.update(workload.kind.section().as_bytes());
        hasher.update(workload.name.as_bytes());
        hasher.update(workload.source.to_string().as_bytes());

        // Sorted by key for determinism
        let mut env_vars: Vec<_> = workload.env_vars.iter().collect();
        env_vars.sort_by(|a, b| a.key.cmp(&b.key));
        for var in env_vars {
            hasher.update(var.key.as_bytes());
            if let Some(value) = &var.value {
                hasher.update(value.as_bytes());
            }
        }

        if let Some(count) = workload.instance_count {
            hasher.update(count.to_be_bytes());
        }
        if let Some(slug) = &workload.instance_size_slug {
            hasher.update(slug.as_bytes());
        }
        for route in &workload.routes {
            hasher.update(route.path.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Computes a short hash (first 8 characters) for display purposes.
    #[must_use]
    pub fn short_hash(&self, hash: &str) -> String {
        hash.chars().take(8).collect()
    }

    /// Compares two hashes in constant time.
    #[must_use]
    pub fn hashes_match(hash1: &str, hash2: &str) -> bool {
        if hash1.len() != hash2.len() {
            return false;
        }

        hash1
            .bytes()
            .zip(hash2.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

// ============================================================================
// Linting - Dangerous or non-idiomatic practices are flagged
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // Public items should be documented
#![warn(dead_code)]                   // Unused code is flagged
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness
#![warn(unused_imports)]              // Unused imports are flagged
#![warn(unused_variables)]            // Unused variables are flagged
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]                 // All standard Clippy lints
#![warn(clippy::pedantic)]            // Very strict Clippy lints
#![warn(clippy::nursery)]             // Experimental lints
#![warn(clippy::unwrap_used)]         // unwrap() warning
#![warn(clippy::expect_used)]         // expect() warning
#![warn(clippy::panic)]               // panic!() warning
#![warn(clippy::print_stdout)]        // println!() warning
#![warn(clippy::todo)]                // TODO warning
#![warn(clippy::unimplemented)]       // unimplemented!() warning
#![warn(clippy::unwrap_in_result)]    // unwrap() in Result warning
#![warn(clippy::redundant_clone)]     // Useless clones warning
#![warn(clippy::cognitive_complexity)] // Limit cognitive complexity

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Appfile
//!
//! Declarative, environment-aware deployment of DigitalOcean App Platform
//! specifications.
//!
//! ## Overview
//!
//! An appfile lists app spec templates and named environments. Each
//! environment is a stack of value files merged in order; the merged values
//! are fed to the spec templates, and the resulting specs are:
//!
//! - Linted locally and dry-run against App Platform
//! - Diffed against the apps already running
//! - Synced (created or updated) or destroyed as a set
//!
//! ## Modules
//!
//! - [`env`]: Value trees and environment merging
//! - [`template`]: Template rendering and extension functions
//! - [`config`]: Manifest, spec loading, defaults, validation, fingerprints
//! - [`planner`]: Spec diffs and reconciliation plans
//! - [`platform`]: App Platform and DNS clients
//! - [`reconciler`]: Sync, destroy, status, diff and lint runs
//! - [`cli`]: Command-line interface
//!
//! ## Example
//!
//! ```yaml
//! # appfile.yaml
//! specs:
//!   - ./app.yaml
//!
//! environments:
//!   review:
//!     - ./envs/review.yaml
//!   production:
//!     - ./envs/production.yaml
//! ```
//!
//! ```yaml
//! # app.yaml
//! name: sample-{{ environment.name }}
//! services:
//!   - name: web
//!     github:
//!       repo: acme/web
//!       branch: {{ values.branch }}
//!     envs:
//!       - key: DATABASE_URL
//!         value: {{ requiredEnv("DATABASE_URL") }}
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod cli;
pub mod config;
pub mod env;
pub mod error;
pub mod planner;
pub mod platform;
pub mod reconciler;
pub mod template;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use config::{AppSpecification, SpecHasher, SpecLoader, SpecValidator, ValidationReport};
pub use env::{Environment, Value};
pub use error::{AppfileError, Result};
pub use planner::{AppDiff, DiffEngine, ReconciliationPlan};
pub use platform::{AppPlatform, DigitalOceanClient, DnsRecords};
pub use reconciler::{AppStatus, Reconciler};
pub use template::TemplateRenderer;

//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{AppSpecification, ValidationReport};
use crate::error::{AppfileError, Result};
use crate::planner::{AppDiff, DiffHunk, DiffOperation, ReconciliationOutcome};
use crate::reconciler::{AppStatus, ComponentSummary, DeploymentStatus, DestroyReport, SyncReport};

use super::commands::OutputFormat;

/// Placeholder for absent values in tables.
const EMPTY_CELL: &str = "-";

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// App status row for table display.
#[derive(Tabled)]
struct AppStatusRow {
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "STATUS")]
    status: String,
    #[tabled(rename = "DEPLOYMENT ID")]
    deployment_id: String,
    #[tabled(rename = "UPDATED")]
    updated_at: String,
    #[tabled(rename = "URL")]
    url: String,
}

/// Component row for table display.
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "KIND")]
    kind: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "SOURCE")]
    source: String,
    #[tabled(rename = "INSTANCES")]
    instances: String,
    #[tabled(rename = "SIZE")]
    size: String,
    #[tabled(rename = "HASH")]
    fingerprint: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
        serde_json::to_string_pretty(value)
            .map_err(|e| AppfileError::internal(format!("Could not serialize output: {e}")))
    }

    /// Formats the result of a sync run.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_sync(&self, report: &SyncReport) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(report);
        }

        let mut output = String::new();
        for app in &report.apps {
            let action = match app.outcome {
                ReconciliationOutcome::Create => "created".green(),
                _ => "updated".yellow(),
            };
            let _ = writeln!(output, "{} {} {action} ({})", "✓".green(), app.name.bold(), app.app_id);
            if let Some(url) = &app.live_url {
                let _ = writeln!(output, "   URL: {url}");
            }
            for domain in &app.domains {
                let _ = writeln!(output, "   Domain: {domain}");
            }
        }
        Ok(output)
    }

    /// Formats the result of a destroy run.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_destroy(&self, report: &DestroyReport) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(report);
        }

        let mut output = String::new();
        for app in &report.destroyed {
            let _ = writeln!(output, "{} {} destroyed", "✓".green(), app.bold());
        }
        if report.dns_records_deleted > 0 {
            let _ = writeln!(output, "   {} DNS record(s) deleted", report.dns_records_deleted);
        }
        Ok(output)
    }

    /// Formats per-app diffs.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_diffs(&self, diffs: &[AppDiff]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(diffs);
        }

        let mut output = String::new();
        for diff in diffs {
            let _ = writeln!(output, "Diff for app {}", diff.name.bold());
            for hunk in &diff.hunks {
                output.push_str(&Self::format_hunk(hunk));
            }
            output.push('\n');
        }
        Ok(output)
    }

    /// Colors a hunk by operation.
    fn format_hunk(hunk: &DiffHunk) -> String {
        let text = hunk.to_string();
        match hunk.operation {
            DiffOperation::Equal => text,
            DiffOperation::Insert => text.green().to_string(),
            DiffOperation::Delete => text.red().to_string(),
        }
    }

    /// Formats app statuses as key/value blocks.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_status(&self, statuses: &[AppStatus]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(statuses);
        }

        let mut output = String::new();
        for row in statuses.iter().map(AppStatusRow::from) {
            let _ = writeln!(output, "Name:          {}", row.name);
            let _ = writeln!(output, "Status:        {}", row.status);
            let _ = writeln!(output, "Deployment ID: {}", row.deployment_id);
            let _ = writeln!(output, "Updated:       {}", row.updated_at);
            let _ = writeln!(output, "URL:           {}", row.url);
            output.push('\n');
        }
        Ok(output)
    }

    /// Formats app statuses as a table.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_list(&self, statuses: &[AppStatus]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(statuses);
        }

        let rows: Vec<AppStatusRow> = statuses.iter().map(AppStatusRow::from).collect();
        Ok(format!("{}\n", Table::new(rows)))
    }

    /// Formats the components of one app as a table.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_components(&self, components: &[ComponentSummary]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(components);
        }

        let rows: Vec<ComponentRow> = components
            .iter()
            .map(|c| ComponentRow {
                kind: c.kind.clone(),
                name: c.name.clone(),
                source: c.source.clone(),
                instances: c.instances.map_or_else(|| EMPTY_CELL.to_string(), |n| n.to_string()),
                size: c.size.clone().unwrap_or_else(|| EMPTY_CELL.to_string()),
                fingerprint: c.fingerprint.clone(),
            })
            .collect();
        Ok(format!("{}\n", Table::new(rows)))
    }

    /// Formats lint findings.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn format_lint(&self, reports: &[ValidationReport]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(reports);
        }

        let mut output = String::new();
        for report in reports {
            if report.is_valid() {
                let _ = writeln!(output, "{} [{}] lint ran successfully", "✓".green(), report.app);
            } else {
                for error in &report.errors {
                    let _ = writeln!(output, "{} [{}] {}", "✗".red(), report.app, error.message);
                }
            }
        }
        Ok(output)
    }

    /// Formats resolved specs.
    ///
    /// # Errors
    ///
    /// Returns an error if a spec cannot be serialized.
    pub fn format_specs(&self, specs: &[AppSpecification]) -> Result<String> {
        if self.format == OutputFormat::Json {
            return Self::json(specs);
        }

        let mut output = String::new();
        for spec in specs {
            output.push_str("---\n");
            if let Some(path) = &spec.source_file {
                let _ = writeln!(output, "# Source: {}", path.display());
            }
            output.push_str(&spec.canonical_yaml()?);
        }
        Ok(output)
    }

    /// Lists the apps a destroy run will delete.
    #[must_use]
    pub fn format_destroy_prompt(specs: &[AppSpecification]) -> String {
        let mut output = String::from("The following apps will be destroyed:\n");
        for spec in specs {
            let _ = writeln!(output, "  - {}", spec.name);
        }
        output
    }
}

impl From<&AppStatus> for AppStatusRow {
    fn from(status: &AppStatus) -> Self {
        let label = status.status.to_string();
        let status_cell = match status.status {
            DeploymentStatus::Deployed => label.green().to_string(),
            DeploymentStatus::InProgress => label.yellow().to_string(),
            DeploymentStatus::Unknown => label.dimmed().to_string(),
        };

        Self {
            name: status.name.clone(),
            status: status_cell,
            deployment_id: status
                .deployment_id
                .clone()
                .unwrap_or_else(|| EMPTY_CELL.to_string()),
            updated_at: status
                .updated_at
                .map_or_else(|| EMPTY_CELL.to_string(), |t| t.to_rfc3339()),
            url: status.url.clone().unwrap_or_else(|| EMPTY_CELL.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ValidationError;

    fn status(name: &str) -> AppStatus {
        AppStatus {
            name: name.to_string(),
            status: DeploymentStatus::Unknown,
            deployment_id: None,
            updated_at: None,
            url: None,
        }
    }

    #[test]
    fn test_list_table_has_headers_and_placeholders() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_list(&[status("web")]).unwrap();

        assert!(output.contains("DEPLOYMENT ID"));
        assert!(output.contains("web"));
        assert!(output.contains("unknown"));
        assert!(output.contains(EMPTY_CELL));
    }

    #[test]
    fn test_status_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_status(&[status("web")]).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(value[0]["name"], "web");
        assert_eq!(value[0]["status"], "unknown");
        assert!(value[0]["deployment_id"].is_null());
    }

    #[test]
    fn test_lint_lines() {
        colored::control::set_override(false);
        let reports = vec![
            ValidationReport {
                app: String::from("web"),
                errors: vec![],
            },
            ValidationReport {
                app: String::from("x"),
                errors: vec![ValidationError::new("name", "Spec name length (x) must be between 2 and 32 characters long")],
            },
        ];

        let output = OutputFormatter::new(OutputFormat::Text).format_lint(&reports).unwrap();

        assert!(output.contains("[web] lint ran successfully"));
        assert!(output.contains("[x] Spec name length (x) must be between 2 and 32 characters long"));
    }

    #[test]
    fn test_render_separates_documents() {
        let specs = vec![
            AppSpecification {
                name: String::from("web"),
                ..AppSpecification::default()
            },
            AppSpecification {
                name: String::from("api"),
                ..AppSpecification::default()
            },
        ];

        let output = OutputFormatter::new(OutputFormat::Text).format_specs(&specs).unwrap();

        assert_eq!(output.matches("---\n").count(), 2);
        assert!(output.contains("name: web"));
        assert!(output.contains("name: api"));
    }

    #[test]
    fn test_unserializable_json_is_an_error() {
        let mut spec = AppSpecification {
            name: String::from("web"),
            ..AppSpecification::default()
        };
        spec.extra.insert(String::from("labels"), serde_yaml::from_str("? [a, b]\n: c\n").unwrap());

        let result = OutputFormatter::new(OutputFormat::Json).format_specs(&[spec]);

        assert!(matches!(result, Err(AppfileError::Internal(_))));
    }
}


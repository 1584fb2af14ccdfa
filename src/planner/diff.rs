//! Diff engine for comparing local and remote specs.
//!
//! Both sides are canonical serializations. The diff is computed line by
//! line and then cleaned up so that small unchanged runs squeezed between
//! two edits are folded into a single coherent hunk.

use std::fmt;

use serde::Serialize;
use similar::{ChangeTag, TextDiff};
use tracing::debug;

use crate::config::{AppSpecification, SpecHasher};
use crate::error::Result;

/// Kind of a diff hunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiffOperation {
    /// Text present on both sides.
    Equal,
    /// Text only present locally.
    Insert,
    /// Text only present remotely.
    Delete,
}

/// A contiguous run of text with one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffHunk {
    /// Operation of this hunk.
    pub operation: DiffOperation,
    /// Text covered by the hunk, newlines included.
    pub text: String,
}

/// Diff between the local and remote version of one app.
#[derive(Debug, Clone, Serialize)]
pub struct AppDiff {
    /// App name.
    pub name: String,
    /// Ordered hunks, remote to local.
    pub hunks: Vec<DiffHunk>,
    /// Fingerprint of the local spec.
    pub local_fingerprint: String,
    /// Fingerprint of the remote spec, if the app exists.
    pub remote_fingerprint: Option<String>,
}

/// Engine for computing spec diffs.
#[derive(Debug, Default)]
pub struct DiffEngine {
    hasher: SpecHasher,
}

/// Intermediate segment used by the cleanup pass.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Equal(String),
    Edit { deleted: String, inserted: String },
}

impl DiffEngine {
    /// Creates a new diff engine.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            hasher: SpecHasher::new(),
        }
    }

    /// Diffs two serialized specs.
    ///
    /// Concatenating `Equal` and `Delete` hunks yields `remote`; concatenating
    /// `Equal` and `Insert` hunks yields `local`. Two empty inputs yield no
    /// hunks.
    #[must_use]
    pub fn diff(&self, local: &str, remote: &str) -> Vec<DiffHunk> {
        let segments = cleanup_semantic(line_segments(remote, local));

        let mut hunks = Vec::with_capacity(segments.len());
        for segment in segments {
            match segment {
                Segment::Equal(text) => hunks.push(DiffHunk {
                    operation: DiffOperation::Equal,
                    text,
                }),
                Segment::Edit { deleted, inserted } => {
                    if !deleted.is_empty() {
                        hunks.push(DiffHunk {
                            operation: DiffOperation::Delete,
                            text: deleted,
                        });
                    }
                    if !inserted.is_empty() {
                        hunks.push(DiffHunk {
                            operation: DiffOperation::Insert,
                            text: inserted,
                        });
                    }
                }
            }
        }
        hunks
    }

    /// Diffs a local spec against its remote counterpart.
    ///
    /// A missing remote app is diffed against an empty document.
    ///
    /// # Errors
    ///
    /// Returns an error if either spec cannot be serialized.
    pub fn diff_app(
        &self,
        local: &AppSpecification,
        remote: Option<&AppSpecification>,
    ) -> Result<AppDiff> {
        let local_text = local.canonical_yaml()?;
        let remote_text = match remote {
            Some(spec) => Some(spec.canonical_yaml()?),
            None => None,
        };

        let hunks = self.diff(&local_text, remote_text.as_deref().unwrap_or_default());
        debug!("Computed {} hunks for app {}", hunks.len(), local.name);

        Ok(AppDiff {
            name: local.name.clone(),
            hunks,
            local_fingerprint: self.hasher.hash_text(&local_text),
            remote_fingerprint: remote_text.as_deref().map(|t| self.hasher.hash_text(t)),
        })
    }
}

/// Groups line changes into alternating equal and edit segments.
fn line_segments(remote: &str, local: &str) -> Vec<Segment> {
    let diff = TextDiff::from_lines(remote, local);
    let mut segments: Vec<Segment> = Vec::new();

    for change in diff.iter_all_changes() {
        let line = change.value();
        match (change.tag(), segments.last_mut()) {
            (ChangeTag::Equal, Some(Segment::Equal(text))) => text.push_str(line),
            (ChangeTag::Equal, _) => segments.push(Segment::Equal(line.to_string())),
            (ChangeTag::Delete, Some(Segment::Edit { deleted, .. })) => deleted.push_str(line),
            (ChangeTag::Insert, Some(Segment::Edit { inserted, .. })) => inserted.push_str(line),
            (ChangeTag::Delete, _) => segments.push(Segment::Edit {
                deleted: line.to_string(),
                inserted: String::new(),
            }),
            (ChangeTag::Insert, _) => segments.push(Segment::Edit {
                deleted: String::new(),
                inserted: line.to_string(),
            }),
        }
    }

    segments
}

/// Folds equalities that are no longer than the edits on both sides of them.
fn cleanup_semantic(mut segments: Vec<Segment>) -> Vec<Segment> {
    while let Some(index) = find_absorbable_equality(&segments) {
        let after = segments.remove(index + 1);
        let equal = segments.remove(index);
        let before = segments.remove(index - 1);

        if let (
            Segment::Edit {
                deleted: d1,
                inserted: i1,
            },
            Segment::Equal(eq),
            Segment::Edit {
                deleted: d2,
                inserted: i2,
            },
        ) = (before, equal, after)
        {
            segments.insert(
                index - 1,
                Segment::Edit {
                    deleted: format!("{d1}{eq}{d2}"),
                    inserted: format!("{i1}{eq}{i2}"),
                },
            );
        }
    }
    segments
}

fn find_absorbable_equality(segments: &[Segment]) -> Option<usize> {
    segments.windows(3).position(|window| match window {
        [before, Segment::Equal(eq), after] => {
            let len = eq.chars().count();
            matches!((edit_weight(before), edit_weight(after)), (Some(b), Some(a)) if len <= b && len <= a)
        }
        _ => false,
    })
    .map(|start| start + 1)
}

fn edit_weight(segment: &Segment) -> Option<usize> {
    match segment {
        Segment::Edit { deleted, inserted } => {
            Some(deleted.chars().count().max(inserted.chars().count()))
        }
        Segment::Equal(_) => None,
    }
}

impl AppDiff {
    /// Returns true if local and remote differ.
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.remote_fingerprint
            .as_deref()
            .is_none_or(|remote| !SpecHasher::hashes_match(remote, &self.local_fingerprint))
    }

    /// Returns true if the app does not exist remotely.
    #[must_use]
    pub const fn is_new(&self) -> bool {
        self.remote_fingerprint.is_none()
    }
}

impl fmt::Display for DiffOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Equal => "equal",
            Self::Insert => "insert",
            Self::Delete => "delete",
        };
        write!(f, "{s}")
    }
}

impl fmt::Display for DiffHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prefix = match self.operation {
            DiffOperation::Equal => ' ',
            DiffOperation::Insert => '+',
            DiffOperation::Delete => '-',
        };
        for line in self.text.lines() {
            writeln!(f, "{prefix}{line}")?;
        }
        Ok(())
    }
}

//! Relationship validation.
//!
//! Findings are advisory: validation never changes the analysis.
//!
//! Import targets that are bare package names (`react`, `express`) are
//! deliberately exempt from the `import_not_found` check, since they name
//! installed dependencies rather than project files.
//!
//! # Known limitation
//!
//! Cycle detection only looks at direct pairs (`A -> B` and `B -> A`, both
//! `import`). Longer cycles such as `A -> B -> C -> A` are not reported.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{import_candidates, is_package_specifier, DependencyRelationship, RelationType};
use crate::cache::ProjectAnalysis;

/// Why an edge is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokenReason {
    FileMissing,
    ImportNotFound,
    CircularDependency,
}

impl fmt::Display for BrokenReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BrokenReason::FileMissing => "file_missing",
            BrokenReason::ImportNotFound => "import_not_found",
            BrokenReason::CircularDependency => "circular_dependency",
        };
        f.write_str(s)
    }
}

/// A finding produced by [`RelationshipValidator::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokenRelationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationType,
    pub reason: BrokenReason,
}

/// Audits an analysis against the filesystem.
pub struct RelationshipValidator {
    project_dir: PathBuf,
}

impl RelationshipValidator {
    pub fn new<P: AsRef<Path>>(project_dir: P) -> Self {
        Self {
            project_dir: project_dir.as_ref().to_path_buf(),
        }
    }

    /// Check every edge.
    ///
    /// A bidirectional import pair is reported once, with `from` set to the
    /// lexicographically smaller path. Bare package targets are never
    /// checked against the filesystem.
    pub fn validate(&self, analysis: &ProjectAnalysis) -> Vec<BrokenRelationship> {
        let mut broken = Vec::new();

        for rel in &analysis.relationships {
            if !self.exists(&rel.from) {
                broken.push(Self::finding(rel, BrokenReason::FileMissing));
                continue;
            }

            if rel.kind == RelationType::Import
                && !is_package_specifier(&rel.to)
                && !self.exists(&rel.to)
            {
                let base = rel.to.strip_prefix("./").unwrap_or(&rel.to);
                let resolves = import_candidates(base)
                    .iter()
                    .any(|c| analysis.structure.contains(c) && self.exists(c));
                if !resolves {
                    broken.push(Self::finding(rel, BrokenReason::ImportNotFound));
                }
            }
        }

        broken.extend(Self::direct_cycles(&analysis.relationships));

        debug!("Validation produced {} findings", broken.len());
        broken
    }

    fn direct_cycles(relationships: &[DependencyRelationship]) -> Vec<BrokenRelationship> {
        let imports: HashSet<(&str, &str)> = relationships
            .iter()
            .filter(|r| r.kind == RelationType::Import && r.from != r.to)
            .map(|r| (r.from.as_str(), r.to.as_str()))
            .collect();

        let pairs: BTreeSet<(&str, &str)> = imports
            .iter()
            .filter(|(from, to)| from < to && imports.contains(&(*to, *from)))
            .copied()
            .collect();

        pairs
            .into_iter()
            .map(|(from, to)| BrokenRelationship {
                from: from.to_string(),
                to: to.to_string(),
                kind: RelationType::Import,
                reason: BrokenReason::CircularDependency,
            })
            .collect()
    }

    fn finding(rel: &DependencyRelationship, reason: BrokenReason) -> BrokenRelationship {
        BrokenRelationship {
            from: rel.from.clone(),
            to: rel.to.clone(),
            kind: rel.kind,
            reason,
        }
    }

    fn exists(&self, rel: &str) -> bool {
        self.project_dir.join(rel).is_file()
    }
}

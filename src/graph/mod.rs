//! Dependency graph between project files.
//!
//! - [`resolver`] - heuristic edge construction (imports, tests, scripts, tsconfig)
//! - [`validator`] - audit of an edge set for dangling endpoints and direct cycles

pub mod resolver;
pub mod validator;

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::extensions;

pub use resolver::{ImportScanner, RelationshipResolver, Resolution, TextualImportScanner};
pub use validator::{BrokenReason, BrokenRelationship, RelationshipValidator};

/// Kind of a dependency edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationType {
    Import,
    Contract,
    Config,
    Test,
    Unknown,
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RelationType::Import => "import",
            RelationType::Contract => "contract",
            RelationType::Config => "config",
            RelationType::Test => "test",
            RelationType::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Directed, typed edge between two repo-relative paths.
///
/// `to` may name an npm-style package rather than a file for bare imports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyRelationship {
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: RelationType,
}

impl DependencyRelationship {
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: RelationType) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
        }
    }

    pub fn import(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::new(from, to, RelationType::Import)
    }

    /// Whether either endpoint is `path`.
    pub fn touches(&self, path: &str) -> bool {
        self.from == path || self.to == path
    }

    /// The endpoint opposite `path`, if the edge touches it.
    pub fn other_end(&self, path: &str) -> Option<&str> {
        if self.from == path {
            Some(&self.to)
        } else if self.to == path {
            Some(&self.from)
        } else {
            None
        }
    }
}

impl fmt::Display for DependencyRelationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {} ({})", self.from, self.to, self.kind)
    }
}

/// Paths tried, in order, when resolving an import of `base`.
///
/// The literal path, then each candidate extension appended, then
/// `base/index` with each extension.
pub fn import_candidates(base: &str) -> Vec<String> {
    let mut candidates = Vec::with_capacity(1 + extensions::IMPORT_CANDIDATES.len() * 2);
    candidates.push(base.to_string());
    for ext in extensions::IMPORT_CANDIDATES {
        candidates.push(format!("{}{}", base, ext));
    }
    for ext in extensions::IMPORT_CANDIDATES {
        candidates.push(format!("{}/index{}", base, ext));
    }
    candidates
}

/// Bare module specifier (`react`, `ethers`) rather than a path.
pub fn is_package_specifier(spec: &str) -> bool {
    !spec.is_empty() && !spec.contains('/') && !spec.contains('.')
}

/// Importers of each file: `to -> [from]` over `import` edges.
pub fn reverse_import_index(relationships: &[DependencyRelationship]) -> HashMap<&str, Vec<&str>> {
    let mut index: HashMap<&str, Vec<&str>> = HashMap::new();
    for rel in relationships
        .iter()
        .filter(|r| r.kind == RelationType::Import)
    {
        index.entry(rel.to.as_str()).or_default().push(rel.from.as_str());
    }
    index
}

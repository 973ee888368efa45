//! Project structure: the partition of tracked files into categories.
//!
//! - [`mapper`] - ordered glob rules that produce a [`ProjectStructure`]

pub mod mapper;

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;

pub use mapper::StructureMapper;

/// Classify every tracked file under `root`.
pub fn map_structure<P: AsRef<Path>>(root: P, config: &AnalysisConfig) -> ProjectStructure {
    StructureMapper::new(root, config).map()
}

/// Category a tracked file belongs to.
///
/// Declaration order is the order in which the mapper tries categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Contracts,
    Backend,
    Frontend,
    Tests,
    Config,
    Scripts,
    Other,
}

impl Category {
    /// All categories in claim order, `Other` last.
    pub fn all() -> &'static [Category] {
        &[
            Category::Contracts,
            Category::Backend,
            Category::Frontend,
            Category::Tests,
            Category::Config,
            Category::Scripts,
            Category::Other,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Contracts => "contracts",
            Category::Backend => "backend",
            Category::Frontend => "frontend",
            Category::Tests => "tests",
            Category::Config => "config",
            Category::Scripts => "scripts",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Seven disjoint sets of repo-relative paths.
///
/// Every tracked file is in exactly one set. Sets are ordered so that
/// serialisation and iteration are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStructure {
    pub contracts: BTreeSet<String>,
    pub backend: BTreeSet<String>,
    pub frontend: BTreeSet<String>,
    pub tests: BTreeSet<String>,
    pub config: BTreeSet<String>,
    pub scripts: BTreeSet<String>,
    pub other: BTreeSet<String>,
}

impl ProjectStructure {
    /// Files in one category.
    pub fn files(&self, category: Category) -> &BTreeSet<String> {
        match category {
            Category::Contracts => &self.contracts,
            Category::Backend => &self.backend,
            Category::Frontend => &self.frontend,
            Category::Tests => &self.tests,
            Category::Config => &self.config,
            Category::Scripts => &self.scripts,
            Category::Other => &self.other,
        }
    }

    fn files_mut(&mut self, category: Category) -> &mut BTreeSet<String> {
        match category {
            Category::Contracts => &mut self.contracts,
            Category::Backend => &mut self.backend,
            Category::Frontend => &mut self.frontend,
            Category::Tests => &mut self.tests,
            Category::Config => &mut self.config,
            Category::Scripts => &mut self.scripts,
            Category::Other => &mut self.other,
        }
    }

    /// Add a file to a category unless another category already holds it.
    ///
    /// Returns `true` if the file was inserted.
    pub fn claim(&mut self, category: Category, path: impl Into<String>) -> bool {
        let path = path.into();
        if self.category_of(&path).is_some() {
            return false;
        }
        self.files_mut(category).insert(path)
    }

    /// Category holding `path`, if it is tracked.
    pub fn category_of(&self, path: &str) -> Option<Category> {
        Category::all()
            .iter()
            .copied()
            .find(|&category| self.files(category).contains(path))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.category_of(path).is_some()
    }

    /// Every tracked file, category by category.
    pub fn all_files(&self) -> impl Iterator<Item = &String> {
        Category::all()
            .iter()
            .flat_map(move |&category| self.files(category).iter())
    }

    pub fn total_files(&self) -> usize {
        Category::all()
            .iter()
            .map(|&category| self.files(category).len())
            .sum()
    }

    /// `(category, count)` pairs in claim order.
    pub fn counts(&self) -> Vec<(Category, usize)> {
        Category::all()
            .iter()
            .map(|&category| (category, self.files(category).len()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_claim_is_first_wins() {
        let mut structure = ProjectStructure::default();
        assert!(structure.claim(Category::Contracts, "contracts/Token.sol"));
        assert!(!structure.claim(Category::Tests, "contracts/Token.sol"));

        assert_eq!(
            structure.category_of("contracts/Token.sol"),
            Some(Category::Contracts)
        );
        assert!(structure.tests.is_empty());
    }

    #[test]
    fn test_counts_and_totals() {
        let mut structure = ProjectStructure::default();
        structure.claim(Category::Backend, "server/index.ts");
        structure.claim(Category::Frontend, "app/page.tsx");
        structure.claim(Category::Other, "lib/util.ts");

        assert_eq!(structure.total_files(), 3);
        assert_eq!(structure.all_files().count(), 3);
        let counts = structure.counts();
        assert_eq!(counts[1], (Category::Backend, 1));
        assert_eq!(counts[6], (Category::Other, 1));
    }

    #[test]
    fn test_category_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Category::Contracts).unwrap(),
            "\"contracts\""
        );
    }
}

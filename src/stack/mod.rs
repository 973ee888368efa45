//! Project technology stack.
//!
//! - [`kinds`] - closed enums for frameworks, languages and package managers
//! - [`detector`] - marker-file and manifest checks producing a [`ProjectStack`]

pub mod detector;
pub mod kinds;

use std::path::Path;

use serde::{Deserialize, Serialize};

pub use detector::StackDetector;
pub use kinds::{BackendFramework, ContractFramework, FrontendFramework, Language, PackageManager};

/// Detect the stack of the project rooted at `root`.
pub fn detect_stack<P: AsRef<Path>>(root: P) -> ProjectStack {
    StackDetector::new(root).detect()
}

/// Detected technology facts for a project.
///
/// Recomputed wholesale on every full analysis; never patched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectStack {
    pub contract_framework: Option<ContractFramework>,
    pub backend_framework: Option<BackendFramework>,
    pub frontend_framework: Option<FrontendFramework>,
    pub language: Option<Language>,
    pub package_manager: Option<PackageManager>,
    pub monorepo: bool,
}

impl ProjectStack {
    /// One-line description, e.g. `hardhat contracts, next frontend, typescript via pnpm`.
    ///
    /// Returns `None` when nothing was detected.
    pub fn describe(&self) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(fw) = self.contract_framework {
            parts.push(format!("{} contracts", fw));
        }
        if let Some(fw) = self.backend_framework {
            parts.push(format!("{} backend", fw));
        }
        if let Some(fw) = self.frontend_framework {
            parts.push(format!("{} frontend", fw));
        }
        match (self.language, self.package_manager) {
            (Some(lang), Some(pm)) => parts.push(format!("{} via {}", lang, pm)),
            (Some(lang), None) => parts.push(lang.to_string()),
            (None, Some(pm)) => parts.push(format!("via {}", pm)),
            (None, None) => {}
        }

        if parts.is_empty() {
            return None;
        }

        let mut text = parts.join(", ");
        if self.monorepo {
            text.push_str(" (monorepo)");
        }
        Some(text)
    }
}

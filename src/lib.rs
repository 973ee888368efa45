//! layermap - Project Dependency Graph & Context Cache
//!
//! Scans a source tree, sorts its files into architectural layers, infers
//! the relationships between them and keeps the result in a cache that can
//! be patched one file at a time.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`stack`] - Framework, language and package-manager detection
//! - [`structure`] - Partitioning files into contract/backend/frontend/test/config/script layers
//! - [`graph`] - Relationship resolution and validation
//! - [`cache`] - Cached analysis with staleness and per-file patching
//! - [`context`] - Focus, recent files and graph-derived working sets
//! - [`service`] - The [`ProjectGraphService`] facade used by hosts
//! - [`config`] - Configuration loading and validation
//! - [`error`] - Custom error types and handling
//!
//! # Example
//!
//! ```rust,ignore
//! use layermap::ProjectGraphService;
//!
//! let mut service = ProjectGraphService::open(".")?;
//! let outcome = service.analyze(false);
//! println!("{} relationships", outcome.analysis.relationships.len());
//!
//! service.on_file_written("src/app.ts");
//! for file in service.get_files_to_auto_load() {
//!     println!("{}", file);
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod graph;
pub mod paths;
pub mod service;
pub mod stack;
pub mod structure;

// Re-export commonly used types
pub use error::{LayermapError, Result};

pub use cache::{AnalysisCache, CachedAnalysis, ProjectAnalysis};
pub use config::AnalysisConfig;
pub use context::{ContextState, ContextTracker, Layer};
pub use graph::{
    BrokenReason, BrokenRelationship, DependencyRelationship, RelationType, RelationshipResolver,
    RelationshipValidator,
};
pub use service::{AnalyzeOutcome, ProjectGraphService};
pub use stack::{detect_stack, ProjectStack, StackDetector};
pub use structure::{map_structure, Category, ProjectStructure, StructureMapper};

//! End-to-end graph tests through the library API.

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use layermap::cache::MemoryStore;
use layermap::{
    AnalysisConfig, BrokenReason, Category, DependencyRelationship, Layer, ProjectGraphService,
    RelationType,
};
use tempfile::TempDir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn service(root: &Path) -> ProjectGraphService {
    ProjectGraphService::with_store(
        root,
        AnalysisConfig::default(),
        Arc::new(MemoryStore::new()),
    )
}

fn fullstack(root: &Path) {
    write(root, "package.json", r#"{"workspaces": ["web", "server"]}"#);
    write(root, "pnpm-lock.yaml", "");
    write(root, "foundry.toml", "[profile.default]");
    write(root, "contracts/Vault.sol", "import \"./Token.sol\";\ncontract Vault {}");
    write(root, "contracts/Token.sol", "contract Token {}");
    write(root, "test/Vault.t.sol", "import \"../contracts/Vault.sol\";");
    write(
        root,
        "server/routes.ts",
        "import express from 'express';\nimport { db } from './db';",
    );
    write(root, "server/db.ts", "export const db = {};");
    write(
        root,
        "server/package.json",
        r#"{"dependencies": {"express": "4.0.0"}}"#,
    );
    write(root, "web/tsconfig.json", "{}");
    write(root, "web/Home.tsx", "import { Button } from './ui/Button';");
    write(root, "web/ui/Button.tsx", "export const Button = () => null;");
    write(root, "script/Deploy.s.sol", "new Vault();");
    write(root, "README.md", "# docs");
}

#[test]
fn test_full_analysis_of_polyglot_tree() {
    let temp = TempDir::new().unwrap();
    fullstack(temp.path());

    let svc = service(temp.path());
    let analysis = svc.analyze(false).analysis;

    assert!(analysis.stack.monorepo);
    assert_eq!(
        analysis.stack.package_manager.map(|pm| pm.to_string()),
        Some("pnpm".to_string())
    );

    let structure = &analysis.structure;
    assert!(structure.contracts.contains("contracts/Vault.sol"));
    assert!(structure.tests.contains("test/Vault.t.sol"));
    assert!(structure.backend.contains("server/routes.ts"));
    assert!(structure.frontend.contains("web/ui/Button.tsx"));
    assert!(structure.config.contains("web/tsconfig.json"));
    assert!(structure.scripts.contains("script/Deploy.s.sol"));
    assert!(!structure.contains("README.md"));

    let rels: HashSet<DependencyRelationship> = analysis.relationships.iter().cloned().collect();
    assert!(rels.contains(&DependencyRelationship::import(
        "contracts/Vault.sol",
        "contracts/Token.sol"
    )));
    assert!(rels.contains(&DependencyRelationship::import(
        "server/routes.ts",
        "server/db.ts"
    )));
    assert!(rels.contains(&DependencyRelationship::import("server/routes.ts", "express")));
    assert!(rels.contains(&DependencyRelationship::import(
        "web/Home.tsx",
        "web/ui/Button.tsx"
    )));
    assert!(rels.contains(&DependencyRelationship::new(
        "web/Home.tsx",
        "web/tsconfig.json",
        RelationType::Config
    )));

    assert!(svc.validate().is_empty());
}

#[test]
fn test_every_file_lands_in_exactly_one_category() {
    let temp = TempDir::new().unwrap();
    fullstack(temp.path());

    let structure = service(temp.path()).analyze(false).analysis.structure;

    let mut seen = HashSet::new();
    for category in Category::all() {
        for file in structure.files(*category) {
            assert!(seen.insert(file.clone()), "{} classified twice", file);
        }
    }
    assert_eq!(seen.len(), structure.total_files());
}

#[test]
fn test_single_import_scenario() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.ts", "import { b } from './b';");
    write(temp.path(), "b.ts", "export const b = 1;");

    let svc = service(temp.path());
    let analysis = svc.analyze(false).analysis;

    assert_eq!(
        analysis.relationships,
        vec![DependencyRelationship::import("a.ts", "b.ts")]
    );
    assert!(svc.validate().is_empty());
}

#[test]
fn test_missing_relative_import_is_reported() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "a.ts", "import x from './missing';");

    let svc = service(temp.path());
    svc.analyze(false);

    let findings = svc.validate();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].reason, BrokenReason::ImportNotFound);
    assert_eq!(findings[0].from, "a.ts");
    assert_eq!(findings[0].kind, RelationType::Import);
}

#[test]
fn test_mutual_import_reported_once() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "src/x.ts", "import { y } from './y';");
    write(temp.path(), "src/y.ts", "import { x } from './x';");

    let svc = service(temp.path());
    svc.analyze(false);

    let findings = svc.validate();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].reason, BrokenReason::CircularDependency);
    assert_eq!(findings[0].from, "src/x.ts");
    assert_eq!(findings[0].to, "src/y.ts");

    assert_eq!(svc.dependents("src/x.ts"), vec!["src/y.ts"]);
}

#[test]
fn test_patched_deletion_never_surfaces_in_related() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "server/a.ts", "import './b';\nimport './c';");
    write(temp.path(), "server/b.ts", "");
    write(temp.path(), "server/c.ts", "");

    let mut svc = service(temp.path());
    svc.analyze(false);
    svc.set_focus(&["server/a.ts"]);
    assert_eq!(svc.context_state().active_layer, Some(Layer::Backend));

    fs::remove_file(temp.path().join("server/b.ts")).unwrap();
    svc.on_file_deleted(temp.path().join("server/b.ts"));

    let related = svc.related::<&str>(&[], 10);
    assert_eq!(related, vec!["server/c.ts"]);
    assert!(!svc
        .get_files_to_auto_load()
        .contains(&"server/b.ts".to_string()));
}

#[test]
fn test_recent_files_keep_the_latest_twenty() {
    let temp = TempDir::new().unwrap();
    for i in 0..25 {
        write(temp.path(), &format!("f{}.ts", i), "");
    }

    let mut svc = service(temp.path());
    svc.analyze(false);
    for i in 0..25 {
        svc.on_file_written(format!("f{}.ts", i));
    }

    let recent = &svc.context_state().recent_files;
    assert_eq!(recent.len(), 20);
    assert_eq!(recent.first().map(String::as_str), Some("f24.ts"));
    assert_eq!(recent.last().map(String::as_str), Some("f5.ts"));
}

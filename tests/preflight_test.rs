//! Pre-flight pipeline: registry-driven scan and replacement on a real
//! manifest, without touching the network.

use pretty_assertions::assert_eq;
use resurrector::{
    BlockReason, BlockingDependencyDetector, Manifest, ReplacementExecutor, ReplacementRegistry,
};
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

fn fixture_repo() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
            "name": "abandoned-widget",
            "dependencies": {
                "node-sass": "^4.14.1",
                "request": "^2.88.0",
                "lodash": "^4.17.21"
            },
            "devDependencies": {
                "gulp-util": "^3.0.8"
            }
        }"#,
    )
    .unwrap();
    dir
}

#[tokio::test]
async fn scan_then_replace_clears_blocking_dependencies() {
    let dir = fixture_repo();
    let registry = ReplacementRegistry::load(dir.path().join("no-registry.json"));

    let manifest = Manifest::load(dir.path()).unwrap();
    let detector = BlockingDependencyDetector::new()
        .with_registry(&registry)
        .without_network();
    let blocked = detector.detect(&manifest.all_dependencies()).await;

    assert_eq!(blocked.len(), 1);
    assert_eq!(blocked[0].name, "node-sass");
    assert_eq!(blocked[0].reason, BlockReason::BuildFailure);
    assert_eq!(blocked[0].replacement.as_deref(), Some("sass"));

    // Apply every registry replacement the manifest matches.
    let applicable: Vec<_> = registry
        .replacements()
        .iter()
        .filter(|r| manifest.contains(&r.old_name))
        .cloned()
        .collect();
    let outcomes = ReplacementExecutor::new(dir.path())
        .execute(&applicable)
        .unwrap();

    // node-sass -> sass, request -> axios, gulp-util removed.
    assert_eq!(outcomes.len(), 3);
    let raw = fs::read_to_string(dir.path().join("package.json")).unwrap();
    let value: Value = serde_json::from_str(&raw).unwrap();
    let deps = value["dependencies"].as_object().unwrap();
    assert!(!deps.contains_key("node-sass"));
    assert!(deps.contains_key("sass"));
    assert!(deps.contains_key("axios"));
    assert_eq!(deps["lodash"], "^4.17.21");
    assert!(!value["devDependencies"]
        .as_object()
        .unwrap()
        .contains_key("gulp-util"));

    // The rewritten manifest no longer trips the detector.
    let manifest = Manifest::load(dir.path()).unwrap();
    let still_blocked = detector.detect(&manifest.all_dependencies()).await;
    assert!(still_blocked.is_empty());
}

#[tokio::test]
async fn replacement_records_flag_manual_review() {
    let dir = fixture_repo();
    let registry = ReplacementRegistry::load(dir.path().join("no-registry.json"));
    let manifest = Manifest::load(dir.path()).unwrap();

    let applicable: Vec<_> = registry
        .replacements()
        .iter()
        .filter(|r| manifest.contains(&r.old_name))
        .cloned()
        .collect();
    let outcomes = ReplacementExecutor::new(dir.path())
        .execute(&applicable)
        .unwrap();

    let sass = outcomes.iter().find(|o| o.package_name == "sass").unwrap();
    assert!(sass.requires_manual_review);
    assert_eq!(sass.old_version, "^4.14.1");
    assert_eq!(sass.new_version, "^1.60.0");
}

//! Built-in fallback knowledge used when no registry file can be loaded.

use super::RegistryFile;
use crate::core::types::{ArchIncompatibleEntry, PackageReplacement};
use chrono::Utc;
use std::collections::HashMap;

fn mapping(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// A small, conservative default set. The shipped knowledge file supersedes
/// this whenever it loads.
pub fn builtin() -> RegistryFile {
    RegistryFile {
        version: "builtin-1".to_string(),
        last_updated: Utc::now(),
        replacements: vec![
            PackageReplacement {
                old_name: "node-sass".into(),
                new_name: "sass".into(),
                version_mapping: mapping(&[("*", "^1.60.0")]),
                requires_code_changes: true,
                code_change_description: Some(
                    "render/renderSync signatures differ; importer API changed".into(),
                ),
            },
            PackageReplacement {
                old_name: "request".into(),
                new_name: "axios".into(),
                version_mapping: mapping(&[("*", "^1.6.0")]),
                requires_code_changes: true,
                code_change_description: Some("callback API becomes promise-based".into()),
            },
            PackageReplacement {
                old_name: "babel-preset-es2015".into(),
                new_name: "@babel/preset-env".into(),
                version_mapping: mapping(&[("*", "^7.23.0")]),
                requires_code_changes: false,
                code_change_description: None,
            },
            PackageReplacement {
                old_name: "phantomjs-prebuilt".into(),
                new_name: "puppeteer".into(),
                version_mapping: mapping(&[("*", "^21.0.0")]),
                requires_code_changes: true,
                code_change_description: Some("headless API is entirely different".into()),
            },
            PackageReplacement {
                old_name: "gulp-util".into(),
                new_name: "".into(),
                version_mapping: HashMap::new(),
                requires_code_changes: true,
                code_change_description: Some(
                    "deprecated with no drop-in successor; inline the helpers used".into(),
                ),
            },
        ],
        architecture_incompatible: vec![
            ArchIncompatibleEntry {
                package_name: "node-sass".into(),
                incompatible_architectures: vec!["aarch64".into(), "arm".into()],
                replacement: Some("sass".into()),
                reason: "no prebuilt binaries for ARM; source build requires legacy node-gyp"
                    .into(),
            },
            ArchIncompatibleEntry {
                package_name: "phantomjs-prebuilt".into(),
                incompatible_architectures: vec!["aarch64".into(), "arm".into()],
                replacement: Some("puppeteer".into()),
                reason: "binary distribution was x86-only".into(),
            },
            ArchIncompatibleEntry {
                package_name: "fibers".into(),
                incompatible_architectures: vec!["aarch64".into()],
                replacement: None,
                reason: "V8 internals it links against no longer exist".into(),
            },
        ],
        known_dead_urls: vec![
            "https://bitbucket.org/ariya/phantomjs/downloads/phantomjs-2.1.1-linux-x86_64.tar.bz2"
                .into(),
        ],
        dead_url_patterns: Some(vec![
            "https://codeload.github.com/*/phantomjs*/tar.gz/**".into(),
            "https://bitbucket.org/ariya/phantomjs/**".into(),
            "http://registry.npmjs.org/**".into(),
        ]),
    }
}

/// Fixed string tables shared across the detector, analyzer, and strategy
/// engine.
///
/// These are the closed sets the repair loop reasons over: manifest group
/// names, lockfile names, and the native-module knowledge baked into the
/// binary (as opposed to the replaceable knowledge file owned by the
/// registry).
/// Manifest dependency group names, in the order fixes visit them.
pub mod dependency_groups {
    pub const DEPENDENCIES: &str = "dependencies";
    pub const DEV_DEPENDENCIES: &str = "devDependencies";
    pub const PEER_DEPENDENCIES: &str = "peerDependencies";
    pub const OPTIONAL_DEPENDENCIES: &str = "optionalDependencies";

    pub const ALL: [&str; 4] = [
        DEPENDENCIES,
        DEV_DEPENDENCIES,
        PEER_DEPENDENCIES,
        OPTIONAL_DEPENDENCIES,
    ];
}

/// Manifest-adjacent files the strategy engine touches.
pub mod manifest_files {
    pub const PACKAGE_JSON: &str = "package.json";
    pub const NPMRC: &str = ".npmrc";
    pub const NODE_MODULES: &str = "node_modules";
    pub const TSCONFIG_JSON: &str = "tsconfig.json";
}

/// Known lockfile names, scanned in this order when none is named.
pub mod lockfiles {
    pub const PACKAGE_LOCK: &str = "package-lock.json";
    pub const YARN_LOCK: &str = "yarn.lock";
    pub const PNPM_LOCK: &str = "pnpm-lock.yaml";
    pub const NPM_SHRINKWRAP: &str = "npm-shrinkwrap.json";

    pub const KNOWN: [&str; 4] = [PACKAGE_LOCK, YARN_LOCK, PNPM_LOCK, NPM_SHRINKWRAP];
}

/// Packages with native bindings that routinely fail to build on modern
/// toolchains. Used as a fallback when regex extraction finds no package
/// name in a native-module failure.
pub const KNOWN_NATIVE_MODULES: [&str; 12] = [
    "node-sass",
    "node-gyp",
    "fsevents",
    "sharp",
    "canvas",
    "bcrypt",
    "sqlite3",
    "grpc",
    "leveldown",
    "libxmljs",
    "fibers",
    "serialport",
];

/// Pure-JS (or maintained) alternatives for native modules, used when a
/// substitute_package template needs a replacement.
pub const NATIVE_MODULE_ALTERNATIVES: [(&str, &str); 5] = [
    ("node-sass", "sass"),
    ("bcrypt", "bcryptjs"),
    ("grpc", "@grpc/grpc-js"),
    ("sqlite3", "better-sqlite3"),
    ("phantomjs-prebuilt", "puppeteer"),
];

/// Packages that block installation outright, independent of version.
/// Each entry: (name, reason is build_failure unless dead-binary, optional
/// replacement).
pub const KNOWN_BLOCKING_PACKAGES: [(&str, Option<&str>); 4] = [
    ("node-sass", Some("sass")),
    ("fibers", None),
    ("phantomjs-prebuilt", Some("puppeteer")),
    ("grpc", Some("@grpc/grpc-js")),
];

pub fn native_alternative(package: &str) -> Option<&'static str> {
    NATIVE_MODULE_ALTERNATIVES
        .iter()
        .find(|(name, _)| *name == package)
        .map(|(_, alt)| *alt)
}

pub fn known_blocking(package: &str) -> Option<Option<&'static str>> {
    KNOWN_BLOCKING_PACKAGES
        .iter()
        .find(|(name, _)| *name == package)
        .map(|(_, replacement)| *replacement)
}

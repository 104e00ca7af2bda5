//! Default configuration values

/// Default configuration file name (TOML)
pub const DEFAULT_CONFIG_TOML: &str = "otasign.toml";

/// Default configuration file name (YAML)
pub const DEFAULT_CONFIG_YAML: &str = "otasign.yaml";

/// Product name embedded in signing identifiers (`com.<product>.<stem>`)
pub const DEFAULT_PRODUCT: &str = "browseros";

/// Get list of config file names to search for, in priority order
pub fn config_file_names() -> Vec<&'static str> {
    vec![
        DEFAULT_CONFIG_TOML,
        DEFAULT_CONFIG_YAML,
        ".otasign.toml",
        ".otasign.yaml",
    ]
}

/// Annotated starting configuration
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# otasign configuration

# Identifier prefix: binaries are signed as com.<product>.<file stem>
product = "browseros"
hardened_runtime = true

# Glob patterns signed when `otasign sign` gets no explicit paths
artifacts = []

[notarization]
enabled = true
profile = "notarytool-profile"

[verification]
enabled = true

[entitlements]
candidates = [
    "resources/entitlements/browseros-executable-entitlements.plist",
    "packages/browseros/resources/entitlements/browseros-executable-entitlements.plist",
]
"#;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const TRAWL_DIR_NAME: &str = ".trawl";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DEFAULT_STRATEGY: &str = "direct";
pub const DISABLED_STRATEGY: &str = "none";
pub const DEFAULT_DISTANCE: i64 = 1;
pub const DEFAULT_MIN_ID_DIGITS: u32 = 4;
pub const DEFAULT_MAX_ID_DIGITS: u32 = 6;

const LARGE_DISTANCE: i64 = 3;
const SHORT_ID_DIGITS: u32 = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TrawlConfig {
    #[serde(default)]
    pub interlink: InterlinkConfig,
    #[serde(default)]
    pub attribution: AttributionConfig,
    #[serde(default)]
    pub linking: LinkingConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterlinkConfig {
    /// Strategy for fuzzy name matching; `"none"` skips the fuzzy phase.
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_distance")]
    pub distance: i64,
    #[serde(default = "default_true")]
    pub merge_colocated: bool,
}

impl InterlinkConfig {
    pub fn fuzzy_strategy(&self) -> Option<&str> {
        let strategy = self.strategy.trim();
        (!strategy.is_empty() && strategy != DISABLED_STRATEGY).then_some(strategy)
    }
}

impl Default for InterlinkConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            distance: DEFAULT_DISTANCE,
            merge_colocated: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionConfig {
    #[serde(default = "default_strategy")]
    pub strategy: String,
    #[serde(default = "default_distance")]
    pub distance: i64,
}

impl Default for AttributionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            distance: DEFAULT_DISTANCE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkingConfig {
    #[serde(default = "default_min_id_digits")]
    pub min_id_digits: u32,
    #[serde(default = "default_max_id_digits")]
    pub max_id_digits: u32,
    #[serde(default)]
    pub extra_keywords: Vec<String>,
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            min_id_digits: DEFAULT_MIN_ID_DIGITS,
            max_id_digits: DEFAULT_MAX_ID_DIGITS,
            extra_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config TOML: {0}")]
    TomlParse(#[from] toml::de::Error),
    #[error("failed to serialize config TOML: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

pub fn trawl_dir(workspace_root: impl AsRef<Path>) -> PathBuf {
    workspace_root.as_ref().join(TRAWL_DIR_NAME)
}

pub fn config_path(workspace_root: impl AsRef<Path>) -> PathBuf {
    trawl_dir(workspace_root).join(CONFIG_FILE_NAME)
}

pub fn load_workspace_config(workspace_root: impl AsRef<Path>) -> Result<TrawlConfig, ConfigError> {
    let path = config_path(workspace_root);
    if !path.exists() {
        return Ok(TrawlConfig::default());
    }

    let raw = fs::read_to_string(path)?;
    let parsed: TrawlConfig = toml::from_str(&raw)?;
    Ok(normalize_config(parsed))
}

pub fn ensure_workspace_config(
    workspace_root: impl AsRef<Path>,
) -> Result<TrawlConfig, ConfigError> {
    let workspace_root = workspace_root.as_ref();
    fs::create_dir_all(trawl_dir(workspace_root))?;

    let path = config_path(workspace_root);
    if path.exists() {
        return load_workspace_config(workspace_root);
    }

    let config = TrawlConfig::default();
    let content = toml::to_string_pretty(&config)?;
    fs::write(path, content)?;

    Ok(config)
}

/// Legal but suspicious settings. Hard errors are raised when the analysis
/// settings are resolved.
pub fn validate_config(config: &TrawlConfig) -> Vec<ConfigWarning> {
    let mut warnings = Vec::new();

    if config.interlink.fuzzy_strategy().is_none() {
        warnings.push(ConfigWarning {
            code: "interlink_fuzzy_disabled",
            message: "interlink.strategy is \"none\"; identities are merged by email only"
                .to_owned(),
        });
    } else if config.interlink.distance > LARGE_DISTANCE {
        warnings.push(ConfigWarning {
            code: "interlink_distance_large",
            message: format!(
                "interlink.distance = {} may merge unrelated identities",
                config.interlink.distance
            ),
        });
    }

    if config.attribution.distance > LARGE_DISTANCE {
        warnings.push(ConfigWarning {
            code: "attribution_distance_large",
            message: format!(
                "attribution.distance = {} may attribute text to the wrong participant",
                config.attribution.distance
            ),
        });
    }

    if config.linking.min_id_digits < SHORT_ID_DIGITS {
        warnings.push(ConfigWarning {
            code: "linking_short_ids",
            message: format!(
                "linking.min_id_digits = {} will treat small numbers as bug ids",
                config.linking.min_id_digits
            ),
        });
    }

    warnings
}

fn default_strategy() -> String {
    DEFAULT_STRATEGY.to_owned()
}

fn default_distance() -> i64 {
    DEFAULT_DISTANCE
}

fn default_true() -> bool {
    true
}

fn default_min_id_digits() -> u32 {
    DEFAULT_MIN_ID_DIGITS
}

fn default_max_id_digits() -> u32 {
    DEFAULT_MAX_ID_DIGITS
}

fn normalize_strategy(value: &str) -> String {
    let value = value.trim().to_ascii_lowercase().replace('-', "_");
    if value.is_empty() {
        default_strategy()
    } else {
        value
    }
}

fn normalize_config(mut config: TrawlConfig) -> TrawlConfig {
    config.interlink.strategy = normalize_strategy(&config.interlink.strategy);
    config.attribution.strategy = normalize_strategy(&config.attribution.strategy);
    config.linking.extra_keywords = config
        .linking
        .extra_keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();
    config
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn ensure_workspace_config_creates_default_file() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();

        let config = ensure_workspace_config(workspace).expect("ensure config");

        assert_eq!(config.interlink.strategy, DEFAULT_STRATEGY);
        assert_eq!(config.attribution.distance, DEFAULT_DISTANCE);
        assert!(config_path(workspace).exists());

        let content = fs::read_to_string(config_path(workspace)).expect("read config file");
        assert!(content.contains("[interlink]"));
        assert!(content.contains("strategy = \"direct\""));
        assert!(content.contains("[linking]"));

        let reloaded = load_workspace_config(workspace).expect("reload config");
        assert_eq!(reloaded, config);
    }

    #[test]
    fn load_workspace_config_parses_and_normalizes_values() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();
        fs::create_dir_all(trawl_dir(workspace)).expect("create .trawl");

        let raw = r#"
[interlink]
strategy = " Double-Metaphone "
distance = 2
merge_colocated = false

[attribution]
strategy = ""

[linking]
min_id_digits = 5
extra_keywords = [" Backout ", ""]
"#;
        fs::write(config_path(workspace), raw).expect("write config");

        let config = load_workspace_config(workspace).expect("load config");

        assert_eq!(config.interlink.strategy, "double_metaphone");
        assert_eq!(config.interlink.distance, 2);
        assert!(!config.interlink.merge_colocated);
        assert_eq!(config.attribution.strategy, DEFAULT_STRATEGY);
        assert_eq!(config.attribution.distance, DEFAULT_DISTANCE);
        assert_eq!(config.linking.min_id_digits, 5);
        assert_eq!(config.linking.max_id_digits, DEFAULT_MAX_ID_DIGITS);
        assert_eq!(config.linking.extra_keywords, vec!["backout".to_owned()]);
    }

    #[test]
    fn missing_config_file_yields_defaults() {
        let temp = tempdir().expect("tempdir");
        let config = load_workspace_config(temp.path()).expect("load config");
        assert_eq!(config, TrawlConfig::default());
        assert!(!config_path(temp.path()).exists());
    }

    #[test]
    fn none_strategy_disables_fuzzy_interlinking() {
        let mut config = TrawlConfig::default();
        assert_eq!(config.interlink.fuzzy_strategy(), Some("direct"));

        config.interlink.strategy = DISABLED_STRATEGY.to_owned();
        assert_eq!(config.interlink.fuzzy_strategy(), None);

        let warnings = validate_config(&config);
        assert!(
            warnings
                .iter()
                .any(|warning| warning.code == "interlink_fuzzy_disabled")
        );
    }

    #[test]
    fn validate_config_flags_large_distances_and_short_ids() {
        let mut config = TrawlConfig::default();
        assert!(validate_config(&config).is_empty());

        config.interlink.distance = 5;
        config.attribution.distance = 4;
        config.linking.min_id_digits = 1;

        let codes = validate_config(&config)
            .into_iter()
            .map(|warning| warning.code)
            .collect::<Vec<_>>();
        assert_eq!(
            codes,
            vec![
                "interlink_distance_large",
                "attribution_distance_large",
                "linking_short_ids"
            ]
        );
    }

    #[test]
    fn mistyped_values_fail_to_parse() {
        let temp = tempdir().expect("tempdir");
        let workspace = temp.path();
        fs::create_dir_all(trawl_dir(workspace)).expect("create .trawl");

        fs::write(config_path(workspace), "[interlink]\ndistance = \"far\"\n")
            .expect("write config");
        let err = load_workspace_config(workspace).expect_err("expected parse error");
        assert!(matches!(err, ConfigError::TomlParse(_)));
    }
}

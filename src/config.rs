//! Crate configuration, loaded from an optional TOML file and merged over
//! built-in defaults — same shape as the teacher's `utils::config::Config`
//! (`ScannerConfig`/`PerformanceConfig`/`OutputConfig`, `serde(default)`),
//! trimmed to the knobs this single-file, single-pass pipeline needs.

use crate::errors::CxResult;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

static DEFAULT_CONFIG_TOML: &str = include_str!("../default-cxgraph.conf");

/// Knobs for the analysis phases (C2/C4–C7).
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Enable the lenient signature-matching rules of §4.5 (reference
    /// binding, template-parameter wildcards, variadics). Disabling this
    /// falls back to exact-arity, exact-text matching only — useful for
    /// unit-testing individual matching rules in isolation.
    pub lenient_matching: bool,

    /// Whether the SDFG engine emits `lastDef` killed-definition edges in
    /// addition to `comesFrom` edges.
    pub dfg_last_def: bool,

    /// Seed `#define NAME VALUE` table consulted by the preprocessor
    /// conditional evaluator, in addition to any `#define`s found in the
    /// analyzed file itself.
    pub preproc_macros: std::collections::HashMap<String, String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            lenient_matching: true,
            dfg_last_def: true,
            preproc_macros: std::collections::HashMap::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct OutputConfig {
    /// `"json"` or `"dot"`.
    pub default_format: String,
    /// Pretty-print JSON output.
    pub pretty: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            default_format: "json".into(),
            pretty: true,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl Config {
    /// Load config from `config_dir/cxgraph.local`, falling back to
    /// built-in defaults and writing an example file the first time.
    pub fn load(config_dir: &Path) -> CxResult<Self> {
        let mut config = Config::default();

        let example_path = config_dir.join("cxgraph.conf");
        if !example_path.exists() {
            fs::create_dir_all(config_dir)?;
            fs::write(&example_path, DEFAULT_CONFIG_TOML)?;
            tracing::debug!("example config written to {}", example_path.display());
        }

        let user_config_path = config_dir.join("cxgraph.local");
        if user_config_path.exists() {
            let content = fs::read_to_string(&user_config_path)?;
            let user: Config = toml::from_str(&content)?;
            config = merge_configs(config, user);
            tracing::debug!("loaded user config from {}", user_config_path.display());
        }

        Ok(config)
    }
}

/// Merge user config into defaults — user values win wherever present.
fn merge_configs(mut default: Config, user: Config) -> Config {
    default.analysis.lenient_matching = user.analysis.lenient_matching;
    default.analysis.dfg_last_def = user.analysis.dfg_last_def;
    default
        .analysis
        .preproc_macros
        .extend(user.analysis.preproc_macros);

    default.output.default_format = user.output.default_format;
    default.output.pretty = user.output.pretty;

    default
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_lenient_and_json() {
        let cfg = Config::default();
        assert!(cfg.analysis.lenient_matching);
        assert_eq!(cfg.output.default_format, "json");
    }

    #[test]
    fn load_creates_example_and_reads_user_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let user_toml = r#"
            [output]
            default_format = "dot"
            pretty = false
        "#;
        fs::write(dir.path().join("cxgraph.local"), user_toml).unwrap();

        let cfg = Config::load(dir.path()).expect("load should succeed");

        assert!(dir.path().join("cxgraph.conf").is_file());
        assert_eq!(cfg.output.default_format, "dot");
        assert!(!cfg.output.pretty);
        assert!(cfg.analysis.lenient_matching);
    }

    #[test]
    fn merge_keeps_default_macros_and_adds_user_macros() {
        let mut default_cfg = Config::default();
        default_cfg
            .analysis
            .preproc_macros
            .insert("FOO".into(), "1".into());

        let mut user_cfg = Config::default();
        user_cfg
            .analysis
            .preproc_macros
            .insert("BAR".into(), "2".into());

        let merged = merge_configs(default_cfg, user_cfg);
        assert_eq!(merged.analysis.preproc_macros.get("FOO").unwrap(), "1");
        assert_eq!(merged.analysis.preproc_macros.get("BAR").unwrap(), "2");
    }
}

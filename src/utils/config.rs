use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Field separator used in test tables
    pub separator: String,

    /// Logging facility attached to every message
    pub facility_id: String,

    /// App map used to resolve window/component names
    pub app_map_name: String,

    /// Default timeout for branch commands (seconds)
    pub default_timeout_secs: u64,

    /// Keep running a table after a general failure
    pub continue_on_failure: bool,

    /// Directory searched for CallScript/CallJUnit executables
    pub scripts_dir: PathBuf,

    /// Program used to check whether a window/component exists
    pub probe_command: Option<PathBuf>,

    /// Delay between existence probes (ms)
    pub probe_interval_ms: u64,

    /// Block to jump to when a driver command was not executed by any engine
    pub script_not_executed_block: Option<String>,

    /// Maximum number of BlockID jumps per table
    pub max_branches: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            separator: ",".to_string(),
            facility_id: "lumi".to_string(),
            app_map_name: String::new(),
            default_timeout_secs: 15,
            continue_on_failure: true,
            scripts_dir: PathBuf::from("scripts"),
            probe_command: None,
            probe_interval_ms: 500,
            script_not_executed_block: None,
            max_branches: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        Self::from_yaml(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
separator: "\t"
appMapName: Login.map
defaultTimeoutSecs: 5
scriptNotExecutedBlock: NotRun
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.separator, "\t");
        assert_eq!(config.app_map_name, "Login.map");
        assert_eq!(config.default_timeout_secs, 5);
        assert_eq!(config.script_not_executed_block.as_deref(), Some("NotRun"));
        assert_eq!(config.facility_id, "lumi");
        assert!(config.continue_on_failure);
        assert_eq!(config.max_branches, 10_000);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        assert_eq!(Config::from_yaml("  \n").unwrap(), Config::default());
    }
}

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::materialize::MaterializeOptions;

/// Project configuration loaded from `.sx.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SxConfig {
    /// Spec document used when no `--input` is given.
    pub input: String,
    pub materialize: MaterializeOptions,
}

impl Default for SxConfig {
    fn default() -> Self {
        Self {
            input: "swagger.yaml".to_string(),
            materialize: MaterializeOptions::default(),
        }
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = ".sx.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<SxConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {}", path.display(), e))?;
    let config: SxConfig = serde_yaml_ng::from_str(&content)
        .map_err(|e| format!("failed to parse config {}: {}", path.display(), e))?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# sx configuration
input: swagger.yaml

materialize:
  escaping: none          # none | percent (percent-encode path and query values)
  scheme_override: index  # index | membership (how a `schema` parameter is checked)
"#
}

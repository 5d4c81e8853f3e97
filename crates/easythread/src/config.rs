//! `easythread.toml` loading.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use easythread_transform::TransformOptions;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "easythread.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProjectConfig {
    pub transform: TransformOptions,
}

impl ProjectConfig {
    pub fn parse(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// An explicit `--config` path must exist; otherwise `easythread.toml`
    /// in the working directory is used when present.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default = Path::new(CONFIG_FILE);
        if default.is_file() {
            log::debug!("using {}", default.display());
            Self::load(default)
        } else {
            Ok(Self::default())
        }
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easythread_transform::CaptureMode;

    #[test]
    fn test_parse_partial() {
        let config = ProjectConfig::parse("[transform]\ncapture = \"none\"\n").unwrap();
        assert_eq!(config.transform.capture, CaptureMode::Disabled);
        assert_eq!(config.transform.marker, "@easythread");
        assert_eq!(config.transform.extensions.len(), 4);
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ProjectConfig::parse("").unwrap(), ProjectConfig::default());
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        assert!(ProjectConfig::parse("[transform]\nmarkers = \"@x\"\n").is_err());
        assert!(ProjectConfig::parse("[build]\nout = \"dist\"\n").is_err());
    }

    #[test]
    fn test_default_round_trips() {
        let text = ProjectConfig::default().to_toml().unwrap();
        assert!(text.contains("capture = \"forward\""));
        assert_eq!(ProjectConfig::parse(&text).unwrap(), ProjectConfig::default());
    }
}

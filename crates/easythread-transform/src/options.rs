//! Transform options, deserializable from the `[transform]` table of
//! `easythread.toml`.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Marker token recognised in `// @easythread` style comments.
pub const DEFAULT_MARKER: &str = "@easythread";

/// Module extensions handled when no list is configured.
pub const DEFAULT_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx"];

/// What happens to variables a relocated function reads from enclosing
/// scopes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// Snapshot the captured values on every call and send them to the
    /// worker as `externalVars`.
    #[default]
    Forward,
    /// Send nothing. The worker sees only its arguments and its own globals.
    #[serde(rename = "none")]
    Disabled,
}

impl CaptureMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureMode::Forward => "forward",
            CaptureMode::Disabled => "none",
        }
    }
}

impl FromStr for CaptureMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "forward" => Ok(CaptureMode::Forward),
            "none" => Ok(CaptureMode::Disabled),
            other => Err(format!(
                "unknown capture mode `{}` (expected `forward` or `none`)",
                other
            )),
        }
    }
}

impl std::fmt::Display for CaptureMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransformOptions {
    /// Comment token that marks a declaration for relocation
    pub marker: String,
    pub capture: CaptureMode,
    /// Extensions (without the dot) of modules the hook transforms
    pub extensions: Vec<String>,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            capture: CaptureMode::default(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

impl TransformOptions {
    /// Whether a file path or bundler module id should be transformed.
    ///
    /// Query and fragment suffixes (`?worker`, `#x`) are ignored, and
    /// virtual module ids starting with `\0` never match.
    pub fn is_candidate(&self, id: &str) -> bool {
        if id.starts_with('\0') {
            return false;
        }
        let path = module_path(id);
        let Some((_, ext)) = path.rsplit_once('.') else {
            return false;
        };
        if ext.contains('/') || ext.contains('\\') {
            return false;
        }
        self.extensions.iter().any(|e| e.trim_start_matches('.') == ext)
    }
}

/// A module id without its `?query` or `#fragment` suffix.
pub fn module_path(id: &str) -> &str {
    let end = id.find(['?', '#']).unwrap_or(id.len());
    &id[..end]
}

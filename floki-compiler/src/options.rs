use std::fs;
use std::path::Path;

use fuf_contract::{ChecksumLayout, DEFAULT_MEMORY_SIZE};
use serde::{Deserialize, Serialize};

use crate::error::CompileError;

/// Knobs for one compilation. Every field has a default, so a config file
/// only needs the keys it changes.
///
/// ```toml
/// memory_size = 512
/// checksum = "legacy"
/// deny_warnings = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompileOptions {
    /// Runtime memory budget written to the header.
    pub memory_size: u32,
    pub checksum: ChecksumLayout,
    /// Fail the compilation if any lint fires.
    pub deny_warnings: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            checksum: ChecksumLayout::Corrected,
            deny_warnings: false,
        }
    }
}

impl CompileOptions {
    pub fn from_toml_str(text: &str) -> Result<Self, CompileError> {
        toml::from_str(text)
            .map_err(|e| CompileError::Configuration(format!("invalid compiler options: {}", e)))
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, CompileError> {
        let text = fs::read_to_string(path).map_err(|e| CompileError::io(path, e))?;
        Self::from_toml_str(&text).map_err(|err| match err {
            CompileError::Configuration(msg) => {
                CompileError::Configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }
}

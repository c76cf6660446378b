//! Harness configuration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::errors::ConfigError;

/// Where fixtures live and how reports are rendered.
///
/// Missing fields fall back to [`HarnessConfig::default`]. Relative paths in a
/// config file are resolved against the file's directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Directory holding one `<label>.d.ts` per Lua target.
    pub declarations_root: PathBuf,
    /// Directory holding the `lib.*.d.ts` standard library files.
    pub lib_dir: PathBuf,
    /// Directory searched recursively for YAML case files.
    pub cases_root: PathBuf,
    pub use_colors: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
        Self {
            declarations_root: manifest_dir.join("fixtures/lua-types"),
            lib_dir: manifest_dir.join("fixtures/typescript/lib"),
            cases_root: manifest_dir.join("cases"),
            use_colors: atty::is(atty::Stream::Stderr),
        }
    }
}

impl HarnessConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_yaml_str(&text)?;
        if let Some(base) = path.parent() {
            for dir in [
                &mut config.declarations_root,
                &mut config.lib_dir,
                &mut config.cases_root,
            ] {
                if dir.is_relative() {
                    *dir = base.join(&*dir);
                }
            }
        }
        Ok(config)
    }
}

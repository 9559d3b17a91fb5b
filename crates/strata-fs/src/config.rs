//! Binding configuration (strata.toml)
//!
//! ```toml
//! [loader]
//! source_suffix = "lua"
//! compiled_suffix = "luac"
//! chunk_prefix = "@"
//!
//! [io]
//! chunk_size = 8192
//!
//! [vfs]
//! write_dir = "out"
//! permit_symlinks = false
//!
//! [[vfs.mount]]
//! path = "assets.zip"
//! point = "/game"
//! append = true
//! ```
//!
//! Every section and field is optional.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::transfer::DEFAULT_CHUNK_SIZE;

/// Parsed `strata.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Module searcher settings
    #[serde(default)]
    pub loader: LoaderConfig,

    /// Streaming I/O settings
    #[serde(default)]
    pub io: IoConfig,

    /// Filesystem setup applied when the library opens
    #[serde(default)]
    pub vfs: VfsConfig,
}

/// Module searcher settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct LoaderConfig {
    /// Suffix of source modules (default: "lua")
    #[serde(default = "default_source_suffix")]
    pub source_suffix: String,

    /// Suffix of precompiled modules (default: "luac")
    #[serde(default = "default_compiled_suffix")]
    pub compiled_suffix: String,

    /// Prefix of chunk names handed to the compiler (default: "@")
    #[serde(default = "default_chunk_prefix")]
    pub chunk_prefix: String,
}

fn default_source_suffix() -> String {
    "lua".to_string()
}

fn default_compiled_suffix() -> String {
    "luac".to_string()
}

fn default_chunk_prefix() -> String {
    "@".to_string()
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            source_suffix: default_source_suffix(),
            compiled_suffix: default_compiled_suffix(),
            chunk_prefix: default_chunk_prefix(),
        }
    }
}

/// Streaming I/O settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct IoConfig {
    /// Largest single read or write issued by a streaming transfer
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
        }
    }
}

/// Filesystem setup
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VfsConfig {
    /// Write directory (host path)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_dir: Option<String>,

    /// Follow symbolic links
    #[serde(default)]
    pub permit_symlinks: bool,

    /// Sources mounted in order
    #[serde(default, rename = "mount")]
    pub mounts: Vec<MountConfig>,
}

/// One mounted source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MountConfig {
    /// Directory or archive on the host
    pub path: String,

    /// Where it appears in the virtual tree (default: root)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point: Option<String>,

    /// Append to the search path (true) or put in front (false)
    #[serde(default = "default_append")]
    pub append: bool,
}

fn default_append() -> bool {
    true
}

impl Config {
    /// Parse a config from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse a config from a string
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the config
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.io.chunk_size == 0 {
            return Err(ConfigError::Invalid(
                "io.chunk_size must be greater than zero".to_string(),
            ));
        }
        for (name, suffix) in [
            ("loader.source_suffix", &self.loader.source_suffix),
            ("loader.compiled_suffix", &self.loader.compiled_suffix),
        ] {
            if suffix.is_empty() || suffix.starts_with('.') {
                return Err(ConfigError::Invalid(format!(
                    "{} must be a non-empty suffix without a leading dot, got '{}'",
                    name, suffix
                )));
            }
        }
        for mount in &self.vfs.mounts {
            if mount.path.is_empty() {
                return Err(ConfigError::Invalid(
                    "vfs.mount entries need a path".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.loader.source_suffix, "lua");
        assert_eq!(config.loader.compiled_suffix, "luac");
        assert_eq!(config.loader.chunk_prefix, "@");
        assert_eq!(config.io.chunk_size, 8192);
        assert!(config.vfs.mounts.is_empty());
    }

    #[test]
    fn test_full_config() {
        let config = Config::from_str(
            r#"
[loader]
source_suffix = "st"

[io]
chunk_size = 512

[vfs]
write_dir = "out"
permit_symlinks = true

[[vfs.mount]]
path = "assets.zip"
point = "/game"

[[vfs.mount]]
path = "mods"
append = false
"#,
        )
        .unwrap();
        assert_eq!(config.loader.source_suffix, "st");
        assert_eq!(config.loader.compiled_suffix, "luac");
        assert_eq!(config.io.chunk_size, 512);
        assert_eq!(config.vfs.write_dir.as_deref(), Some("out"));
        assert!(config.vfs.permit_symlinks);
        assert_eq!(config.vfs.mounts.len(), 2);
        assert_eq!(config.vfs.mounts[0].point.as_deref(), Some("/game"));
        assert!(config.vfs.mounts[0].append);
        assert!(!config.vfs.mounts[1].append);
    }

    #[test]
    fn test_zero_chunk_size_rejected() {
        let err = Config::from_str("[io]\nchunk_size = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_bad_suffix_rejected() {
        let err = Config::from_str("[loader]\nsource_suffix = \".lua\"\n").unwrap_err();
        assert!(err.to_string().contains("loader.source_suffix"));
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = Config::from_str("[io]\nchunk = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Path::new("/definitely/not/here/strata.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}

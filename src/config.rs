use anyhow::Context;
use serde::Deserialize;
use std::fs;
use std::path::PathBuf;

use crate::record::{EntityKind, StrictTypes};
use crate::storage::{Header, ReadOptions, WriteOptions, DEFAULT_COMPRESSION_LEVEL, ONDA_FORMAT_VERSION};

#[derive(Debug, Clone, Deserialize)]
pub struct CodecConfig {
    #[serde(default = "default_compression_level")]
    pub compression_level: i32,
    /// Written into the header of newly created datasets.
    #[serde(default = "default_ordered_keys")]
    pub ordered_keys: bool,
    /// Entity kinds always decoded strictly, in addition to the header's choice.
    #[serde(default)]
    pub strict_types: Vec<EntityKind>,
    #[serde(default)]
    pub reject_incompatible_versions: bool,
}

fn default_compression_level() -> i32 {
    DEFAULT_COMPRESSION_LEVEL
}

fn default_ordered_keys() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub codec: CodecConfig,
}

impl AppConfig {
    pub fn load_default() -> anyhow::Result<Self> {
        let default = include_str!("../config/default.toml");
        let cfg: AppConfig = toml::from_str(default).context("parsing built-in default config")?;
        Ok(cfg)
    }

    pub fn load_from(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let p = path.into();
        let s = fs::read_to_string(&p).with_context(|| format!("reading config {}", p.display()))?;
        let cfg: AppConfig = toml::from_str(&s).with_context(|| format!("parsing config {}", p.display()))?;
        Ok(cfg)
    }

    pub fn read_options(&self) -> ReadOptions {
        ReadOptions {
            extra_strict: self.codec.strict_types.iter().copied().collect::<StrictTypes>(),
            reject_incompatible_versions: self.codec.reject_incompatible_versions,
        }
    }

    pub fn write_options(&self) -> WriteOptions {
        WriteOptions {
            compression_level: self.codec.compression_level,
        }
    }

    /// Header for a dataset created with this configuration.
    pub fn new_header(&self) -> Header {
        Header {
            onda_format_version: ONDA_FORMAT_VERSION,
            ordered_keys: self.codec.ordered_keys,
        }
    }
}

//! Optional `avatar-fetch.toml` holding output directories, default asset
//! toggles and endpoint overrides.

use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use fs_err as fs;
use serde::Deserialize;
use thiserror::Error;

use crate::{
    mii_api::MiiEndpoints,
    roblox_api::{RobloxEndpoints, ThumbnailPolling},
};

pub const CONFIG_FILE_NAME: &str = "avatar-fetch.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("Error deserializing TOML from path {}", .path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Config {
    pub mii: MiiConfig,
    pub roblox: RobloxConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct MiiConfig {
    pub output_dir: PathBuf,
    pub gif: bool,
    pub frames: bool,
    pub hd: bool,
    pub endpoints: MiiEndpoints,
}

impl Default for MiiConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("~/Pictures/mii"),
            gif: false,
            frames: false,
            hd: false,
            endpoints: MiiEndpoints::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct RobloxConfig {
    pub output_dir: PathBuf,
    pub pieces: bool,
    pub thumbnail_poll_attempts: u32,
    pub thumbnail_poll_interval_ms: u64,
    pub endpoints: RobloxEndpoints,
}

impl Default for RobloxConfig {
    fn default() -> Self {
        let polling = ThumbnailPolling::default();

        Self {
            output_dir: PathBuf::from("~/Pictures/roblox"),
            pieces: false,
            thumbnail_poll_attempts: polling.attempts,
            thumbnail_poll_interval_ms: polling.interval.as_millis() as u64,
            endpoints: RobloxEndpoints::default(),
        }
    }
}

impl RobloxConfig {
    pub fn polling(&self) -> ThumbnailPolling {
        ThumbnailPolling {
            attempts: self.thumbnail_poll_attempts,
            interval: Duration::from_millis(self.thumbnail_poll_interval_ms),
        }
    }
}

impl Config {
    /// Reads the config from `path` when given. Otherwise falls back to
    /// `avatar-fetch.toml` in `working_dir` and then to the defaults.
    pub fn load(path: Option<&Path>, working_dir: &Path) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::read_from_file(path),
            None => {
                let path = working_dir.join(CONFIG_FILE_NAME);

                match fs::read_to_string(&path) {
                    Ok(contents) => Self::parse(&contents, &path),
                    Err(err) if err.kind() == io::ErrorKind::NotFound => {
                        log::trace!("No config at {}, using defaults", path.display());
                        Ok(Self::default())
                    }
                    Err(err) => Err(err.into()),
                }
            }
        }
    }

    pub fn read_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::parse(&contents, path)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, ConfigError> {
        let config = toml::from_str(contents).map_err(|source| ConfigError::Toml {
            path: path.to_owned(),
            source,
        })?;

        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }
}

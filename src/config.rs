//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/unflattened/unflattened.toml`
//! 3. Explicit config file (`--config`)
//! 4. Environment variables: `UNFLATTENED_*` prefix, `__` between sections

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::{ApplicationError, ApplicationResult};
use crate::domain::{
    DuplicateKeyPolicy, FlattenOptions, KeyGenerator, SequenceKeys, UnflattenOptions, UuidKeys,
};

/// Flatten pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FlattenSettings {
    /// Capacity of the producer/consumer channel
    pub buffer_size: usize,
    /// Abort flattening after this many milliseconds
    pub timeout_ms: Option<u64>,
}

impl Default for FlattenSettings {
    fn default() -> Self {
        Self {
            buffer_size: crate::domain::flatten::DEFAULT_BUFFER_SIZE,
            timeout_ms: None,
        }
    }
}

/// Unflatten pipeline settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct UnflattenSettings {
    pub duplicate_keys: DuplicateKeyPolicy,
    pub dedup_children: bool,
    pub detect_cycles: bool,
}

/// How keys are generated for documents that do not carry them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeyStrategy {
    #[default]
    Uuid,
    Sequence,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KeySettings {
    pub strategy: KeyStrategy,
    /// Prefix for `sequence` keys
    pub prefix: String,
}

impl Default for KeySettings {
    fn default() -> Self {
        Self {
            strategy: KeyStrategy::Uuid,
            prefix: "n".into(),
        }
    }
}

/// Unified configuration for unflattened.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    pub flatten: FlattenSettings,
    pub unflatten: UnflattenSettings,
    pub keys: KeySettings,
}

/// Get the XDG config directory for unflattened.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "unflattened").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("unflattened.toml"))
}

/// Expand `~`, `$VAR` and `${VAR}` in a path.
pub fn expand_path(path: &Path) -> PathBuf {
    let raw = path.to_string_lossy();
    shellexpand::full(raw.as_ref())
        .map(|s| PathBuf::from(s.into_owned()))
        .unwrap_or_else(|_| path.to_path_buf())
}

impl Settings {
    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `explicit` - Optional config file given on the command line; must exist
    pub fn load(explicit: Option<&Path>) -> ApplicationResult<Self> {
        Self::load_layers(global_config_path().as_deref(), explicit)
    }

    /// Load settings from an explicit set of layers.
    ///
    /// `global` is optional and may be missing on disk; `explicit` must exist.
    pub fn load_layers(global: Option<&Path>, explicit: Option<&Path>) -> ApplicationResult<Self> {
        let defaults = Settings::default();
        let mut builder = Config::builder()
            .set_default("flatten.buffer_size", defaults.flatten.buffer_size as u64)
            .map_err(config_err)?
            .set_default("unflatten.duplicate_keys", "last_wins")
            .map_err(config_err)?
            .set_default("unflatten.dedup_children", defaults.unflatten.dedup_children)
            .map_err(config_err)?
            .set_default("unflatten.detect_cycles", defaults.unflatten.detect_cycles)
            .map_err(config_err)?
            .set_default("keys.strategy", "uuid")
            .map_err(config_err)?
            .set_default("keys.prefix", defaults.keys.prefix.clone())
            .map_err(config_err)?;

        if let Some(global_path) = global {
            debug!("global config: {}", global_path.display());
            builder = builder.add_source(File::from(expand_path(global_path)).required(false));
        }

        if let Some(path) = explicit {
            let path = expand_path(path);
            if !path.exists() {
                return Err(ApplicationError::Config {
                    message: format!("config file not found: {}", path.display()),
                });
            }
            debug!("explicit config: {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix("UNFLATTENED")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_err)?;
        let mut settings: Self = config.try_deserialize().map_err(config_err)?;
        settings.normalize();
        Ok(settings)
    }

    fn normalize(&mut self) {
        if self.flatten.buffer_size == 0 {
            warn!("flatten.buffer_size must be at least 1, using 1");
            self.flatten.buffer_size = 1;
        }
    }

    pub fn flatten_options(&self) -> FlattenOptions {
        FlattenOptions {
            buffer_size: self.flatten.buffer_size,
            timeout: self.flatten.timeout_ms.map(Duration::from_millis),
            cancel: None,
        }
    }

    pub fn unflatten_options(&self) -> UnflattenOptions {
        UnflattenOptions {
            duplicate_keys: self.unflatten.duplicate_keys,
            dedup_children: self.unflatten.dedup_children,
            detect_cycles: self.unflatten.detect_cycles,
        }
    }

    pub fn key_generator(&self) -> Box<dyn KeyGenerator> {
        match self.keys.strategy {
            KeyStrategy::Uuid => Box::new(UuidKeys),
            KeyStrategy::Sequence => Box::new(SequenceKeys::new(self.keys.prefix.clone())),
        }
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}

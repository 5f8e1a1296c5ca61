//! Engine settings loaded from `skirmish.toml`.
//!
//! Every field has a default, so a partial file (or no file at all) is valid.
//! [`EngineConfig::load`] never fails: a missing or unparsable file is logged
//! and the defaults are used instead.
//!
//! ```toml
//! [coords]
//! row_base = "one"
//!
//! [animation]
//! speed_scale = 1.0
//! move_cells_per_second = 4.0
//!
//! [combat]
//! feet_per_cell = 5
//!
//! [lookup]
//! prefix_fallback = false
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use skirmish_data::RowBase;
use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "SKIRMISH_CONFIG";
/// File name searched for in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "skirmish.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub coords: CoordsConfig,
    pub animation: AnimationConfig,
    pub combat: CombatConfig,
    pub lookup: LookupConfig,
    pub sync: SyncConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordsConfig {
    /// Whether `A1` or `A0` names the top-left cell.
    pub row_base: RowBase,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    /// Global multiplier on elapsed time for moves and effects.
    pub speed_scale: f64,
    /// Walking speed of a token, in cells per second before scaling.
    pub move_cells_per_second: f64,
    /// Distance under which a token snaps onto its waypoint.
    pub arrival_epsilon: f64,
    /// Seconds an attack animation lives when the script gives no `DUR`.
    pub attack_duration: f64,
    pub attack_speed: f64,
    /// Seconds an `EFFECT` lives when the script gives no `DUR`.
    pub effect_duration: f64,
    pub effect_speed: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            speed_scale: 1.0,
            move_cells_per_second: 4.0,
            arrival_epsilon: 1e-3,
            attack_duration: 0.6,
            attack_speed: 1.0,
            effect_duration: 1.5,
            effect_speed: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Feet covered by one grid cell; turns a speed in feet into a cell budget.
    pub feet_per_cell: u32,
    /// Hit points for tokens whose definition names none.
    pub default_hp: i32,
}

impl Default for CombatConfig {
    fn default() -> Self {
        Self {
            feet_per_cell: 5,
            default_hp: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Resolve a token reference by id prefix when no id matches exactly.
    pub prefix_fallback: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Delay between follower polls, and before retrying a failed one.
    pub poll_interval_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self { poll_interval_ms: 1000 }
    }
}

impl SyncConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl EngineConfig {
    /// Parse settings from TOML text.
    ///
    /// # Errors
    /// Returns an error if the text is not valid TOML or a field has the wrong type.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read settings from a file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Read settings from a file, falling back to defaults on any error.
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(config) => {
                info!("engine config loaded from '{}'", path.display());
                config
            },
            Err(err) => {
                warn!("{err}; using default engine config");
                Self::default()
            },
        }
    }

    /// Load from the first config file found by [`locate_config`], or use defaults.
    pub fn load_default() -> Self {
        match locate_config() {
            Some(path) => Self::load(&path),
            None => {
                info!("no {CONFIG_FILE_NAME} found; using default engine config");
                Self::default()
            },
        }
    }
}

/// Find the config file: `$SKIRMISH_CONFIG`, then `./skirmish.toml`, then
/// `<user config dir>/skirmish/skirmish.toml`.
pub fn locate_config() -> Option<PathBuf> {
    if let Ok(explicit) = env::var(CONFIG_ENV_VAR)
        && !explicit.trim().is_empty()
    {
        return Some(PathBuf::from(explicit));
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.is_file() {
        return Some(local);
    }
    dirs::config_dir()
        .map(|dir| user_config_path(&dir))
        .filter(|path| path.is_file())
}

fn user_config_path(base: &Path) -> PathBuf {
    let mut path = base.to_path_buf();
    path.push("skirmish");
    path.push(CONFIG_FILE_NAME);
    path
}

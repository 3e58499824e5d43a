use juggle_core::{Limits, Physics, Vec3, MAX_HEIGHT, MAX_MULTIPLEX, MAX_PERIOD, MAX_ROWS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Errors raised while reading a configuration file
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for checking and performing patterns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JuggleConfig {
    pub physics: PhysicsConfig,
    pub timing: TimingConfig,
    pub limits: LimitsConfig,
    /// Beats of throw events listed ahead of the live position
    pub lookahead_beats: usize,
}

impl Default for JuggleConfig {
    fn default() -> Self {
        JuggleConfig {
            physics: PhysicsConfig::default(),
            timing: TimingConfig::default(),
            limits: LimitsConfig::default(),
            lookahead_beats: 32,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: Vec3,
    /// Fraction of vertical speed kept after a floor bounce
    pub restitution: f64,
    /// Height of the floor plane
    pub floor: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        let physics = Physics::default();
        PhysicsConfig {
            gravity: physics.gravity,
            restitution: physics.restitution,
            floor: physics.floor,
        }
    }
}

impl From<PhysicsConfig> for Physics {
    fn from(config: PhysicsConfig) -> Self {
        Physics {
            gravity: config.gravity,
            restitution: config.restitution,
            floor: config.floor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Seconds per unit of pattern time
    pub beat_duration: f64,
    /// Fraction of the throwing beat before release
    pub pre_dwell: f64,
    /// Fraction of the catching beat spent holding before the catch
    pub post_dwell: f64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            beat_duration: 0.25,
            pre_dwell: 0.0,
            post_dwell: 0.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub max_rows: usize,
    pub max_period: usize,
    /// May be lowered below the built-in ceiling, never raised
    pub max_multiplex: usize,
    /// Tallest throw accepted, in beats
    pub max_height: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        LimitsConfig {
            max_rows: MAX_ROWS,
            max_period: MAX_PERIOD,
            max_multiplex: MAX_MULTIPLEX,
            max_height: MAX_HEIGHT,
        }
    }
}

impl From<LimitsConfig> for Limits {
    fn from(config: LimitsConfig) -> Self {
        Limits {
            max_rows: config.max_rows,
            max_period: config.max_period,
            max_multiplex: config.max_multiplex.min(MAX_MULTIPLEX),
            max_height: config.max_height,
        }
    }
}

/// Deserialize a JSON file
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigFileError> {
    let display = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|source| ConfigFileError::Io {
        path: display.clone(),
        source,
    })?;
    serde_json::from_str(&contents).map_err(|source| ConfigFileError::Parse {
        path: display,
        source,
    })
}

impl JuggleConfig {
    /// Read a JSON configuration file; missing fields keep their defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigFileError> {
        let config: JuggleConfig = read_json(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigFileError> {
        let timing = &self.timing;
        if !(timing.beat_duration.is_finite() && timing.beat_duration > 0.0) {
            return Err(ConfigFileError::Invalid(format!(
                "beat_duration {} must be positive",
                timing.beat_duration
            )));
        }
        for (name, dwell) in [("pre_dwell", timing.pre_dwell), ("post_dwell", timing.post_dwell)] {
            if !(0.0..=1.0).contains(&dwell) {
                return Err(ConfigFileError::Invalid(format!(
                    "{name} {dwell} outside [0, 1]"
                )));
            }
        }
        let limits = &self.limits;
        if limits.max_rows == 0 || limits.max_period == 0 || limits.max_multiplex == 0 || limits.max_height == 0 {
            return Err(ConfigFileError::Invalid("limits must be at least 1".into()));
        }
        Ok(())
    }

    pub fn physics(&self) -> Physics {
        self.physics.into()
    }

    pub fn limits(&self) -> Limits {
        self.limits.into()
    }
}

//! Configuration validator and board configuration file.
//!
//! This module contains two layers:
//! - The peripheral configuration validator: [`validate`] checks integer
//!   codes against the closed, compiled-in legal sets and is the only way
//!   to construct a [`ValidatedConfig`].
//! - [`BoardConfig`] - runtime options loaded from `board.toml`.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ─── Configuration Validator ────────────────────────────────────────

/// Kind of a peripheral configuration code.
///
/// Each kind has a fixed legal set of integer codes known at build time;
/// the sets are not user-extensible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum ConfigKind {
    /// Barometer pressure oversampling ratio.
    BarometerOversample = 0,
    /// Barometer IIR filter coefficient (0 = filter off).
    BarometerFilter = 1,
}

impl ConfigKind {
    /// The closed set of legal codes for this kind.
    pub const fn legal_codes(&self) -> &'static [u16] {
        match self {
            // BMP280 oversampling ratios.
            Self::BarometerOversample => &[1, 2, 4, 8, 16],
            // BMP280 IIR filter coefficients; 0 disables the filter.
            Self::BarometerFilter => &[0, 2, 4, 8, 16],
        }
    }

    /// Membership test against the legal set.
    pub fn is_legal(&self, code: u16) -> bool {
        self.legal_codes().contains(&code)
    }
}

impl std::fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BarometerOversample => write!(f, "barometer_oversample"),
            Self::BarometerFilter => write!(f, "barometer_filter"),
        }
    }
}

/// A configuration code that has passed validation.
///
/// Construction goes through [`validate`] only — there is no other way to
/// obtain one, so a handle can never carry an unvalidated code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedConfig {
    kind: ConfigKind,
    code: u16,
}

impl ValidatedConfig {
    /// The kind this code belongs to.
    #[inline]
    pub fn kind(&self) -> ConfigKind {
        self.kind
    }

    /// The validated integer code.
    #[inline]
    pub fn code(&self) -> u16 {
        self.code
    }
}

/// Validate a configuration code against the legal set for its kind.
///
/// Pure function with no hardware side effect — callable in any operating
/// state. Never clamps or coerces: a code outside the legal set fails with
/// [`ConfigError::InvalidConfigValue`].
pub fn validate(kind: ConfigKind, code: u16) -> Result<ValidatedConfig, ConfigError> {
    if kind.is_legal(code) {
        Ok(ValidatedConfig { kind, code })
    } else {
        Err(ConfigError::InvalidConfigValue { kind, code })
    }
}

/// Validated barometer configuration — oversample plus filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BarometerConfig {
    /// Oversampling ratio.
    pub oversample: ValidatedConfig,
    /// IIR filter coefficient.
    pub filter: ValidatedConfig,
}

impl BarometerConfig {
    /// Build from two already-validated codes, rejecting kind mismatches.
    pub fn new(
        oversample: ValidatedConfig,
        filter: ValidatedConfig,
    ) -> Result<Self, ConfigError> {
        if oversample.kind() != ConfigKind::BarometerOversample {
            return Err(ConfigError::KindMismatch {
                expected: ConfigKind::BarometerOversample,
                actual: oversample.kind(),
            });
        }
        if filter.kind() != ConfigKind::BarometerFilter {
            return Err(ConfigError::KindMismatch {
                expected: ConfigKind::BarometerFilter,
                actual: filter.kind(),
            });
        }
        Ok(Self { oversample, filter })
    }

    /// Validate raw codes and build the config in one step.
    pub fn from_codes(oversample: u16, filter: u16) -> Result<Self, ConfigError> {
        Self::new(
            validate(ConfigKind::BarometerOversample, oversample)?,
            validate(ConfigKind::BarometerFilter, filter)?,
        )
    }
}

/// Immutable validated configuration attached to a handle at init time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeripheralConfig {
    /// Barometer oversample + filter settings.
    Barometer(BarometerConfig),
}

// ─── Board Configuration File ───────────────────────────────────────

/// Default function for poll_interval_ms
fn default_poll_interval_ms() -> u32 {
    DEFAULT_POLL_INTERVAL_MS
}

/// Default function for driver
fn default_driver() -> String {
    "simulation".to_string()
}

/// Default button poll interval in milliseconds.
pub const DEFAULT_POLL_INTERVAL_MS: u32 = 10;

/// Barometer section of `board.toml`. Codes are validated through the
/// configuration validator when [`BoardConfig::validate`] runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BarometerSettings {
    /// Oversampling ratio code.
    pub oversample: u16,
    /// IIR filter coefficient code.
    pub filter: u16,
}

impl Default for BarometerSettings {
    fn default() -> Self {
        Self {
            oversample: 4,
            filter: 4,
        }
    }
}

/// Runtime options loaded from `board.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Name of the board driver to load (e.g., "simulation").
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Button monitor poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u32,

    /// Barometer configuration codes.
    #[serde(default)]
    pub barometer: BarometerSettings,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            barometer: BarometerSettings::default(),
        }
    }
}

impl BoardConfig {
    /// Parse a board configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validate the board configuration.
    ///
    /// # Validation Rules
    /// 1. `driver` is non-empty
    /// 2. `poll_interval_ms` in `1..=1000`
    /// 3. barometer codes are members of their legal sets
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::Parse("driver name is empty".to_string()));
        }
        if self.poll_interval_ms == 0 || self.poll_interval_ms > 1000 {
            return Err(ConfigError::OutOfRange {
                field: "poll_interval_ms",
                value: self.poll_interval_ms as i64,
            });
        }
        validate(ConfigKind::BarometerOversample, self.barometer.oversample)?;
        validate(ConfigKind::BarometerFilter, self.barometer.filter)?;
        Ok(())
    }

    /// Build the validated barometer configuration from this file.
    pub fn barometer_config(&self) -> Result<BarometerConfig, ConfigError> {
        BarometerConfig::from_codes(self.barometer.oversample, self.barometer.filter)
    }
}

/// Load and validate a board configuration from a TOML file.
pub fn load_board_config(path: &std::path::Path) -> Result<BoardConfig, ConfigError> {
    tracing::info!("Loading board configuration from {:?}", path);

    let content = std::fs::read_to_string(path).map_err(|e| {
        ConfigError::Parse(format!("Failed to read config file {path:?}: {e}"))
    })?;

    let config = BoardConfig::from_toml(&content)?;
    config.validate()?;
    Ok(config)
}

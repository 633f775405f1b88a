//! Prelude module for common re-exports.
//!
//! This module provides convenient re-exports of commonly used types
//! so that consumers can do `use cape_common::prelude::*;` and get
//! the most important types without listing individual paths.

// ─── State ──────────────────────────────────────────────────────────
pub use crate::state::OperatingState;

// ─── Peripherals ────────────────────────────────────────────────────
pub use crate::peripheral::{
    BarometerReading, ButtonEvent, ButtonId, EncoderChannel, LedColor, PeripheralId, PowerRail,
    Value,
};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    validate, BarometerConfig, BoardConfig, ConfigKind, PeripheralConfig, ValidatedConfig,
};

// ─── Drivers ────────────────────────────────────────────────────────
pub use crate::driver::{BoardDriver, DriverFactory};

// ─── Errors ─────────────────────────────────────────────────────────
pub use crate::error::{CapeError, ConfigError};

//! Error types for cape operations.
//!
//! All variants are recoverable-by-caller conditions surfaced as explicit
//! results; none of them leaves the registry or the state machine in an
//! inconsistent state.

use thiserror::Error;

use crate::config::ConfigKind;
use crate::peripheral::PeripheralId;
use crate::state::OperatingState;

/// Error types for cape runtime operations.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CapeError {
    /// Requested state edge is not in the permitted-edge table.
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidTransition {
        /// State the machine was in when the transition was attempted.
        from: OperatingState,
        /// Requested target state.
        to: OperatingState,
    },

    /// Operation attempted outside its permitted operating states.
    #[error("Operation not permitted while {state}")]
    NotRunning {
        /// Operating state observed by the gate check.
        state: OperatingState,
    },

    /// Peripheral is already claimed by a still-live handle.
    #[error("Peripheral already claimed: {id}")]
    AlreadyClaimed {
        /// Contested identity.
        id: PeripheralId,
    },

    /// Configuration applied to an already-initialized handle without reset.
    #[error("Peripheral already initialized: {id}")]
    AlreadyInitialized {
        /// Identity that already carries a configuration.
        id: PeripheralId,
    },

    /// Stateful peripheral accessed before its configuration was applied.
    #[error("Peripheral not initialized: {id}")]
    NotInitialized {
        /// Identity read before `apply_config`.
        id: PeripheralId,
    },

    /// Handle is stale — the claim it refers to has been released.
    #[error("Peripheral not claimed: {id}")]
    NotClaimed {
        /// Identity the stale handle refers to.
        id: PeripheralId,
    },

    /// Write attempted on an identity that does not support actuation.
    #[error("Peripheral does not support actuation: {id}")]
    NotActuator {
        /// Input-only identity.
        id: PeripheralId,
    },

    /// Configuration applied to an identity it does not belong to.
    #[error("Configuration does not apply to peripheral: {id}")]
    ConfigNotApplicable {
        /// Identity the configuration was wrongly applied to.
        id: PeripheralId,
    },

    /// Underlying hardware access failed.
    #[error("Hardware I/O error: {0}")]
    Io(String),

    /// Runtime initialization failed.
    #[error("Initialization failed: {0}")]
    InitFailed(String),

    /// No board driver with the given name is registered.
    #[error("Driver not found: {0}")]
    DriverNotFound(String),

    /// A driver factory is already registered under this name.
    #[error("Driver already registered: {0}")]
    DriverAlreadyRegistered(String),

    /// Configuration validation failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Configuration validation error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Code is not a member of the legal set for its kind.
    #[error("Invalid configuration value for {kind}: {code}")]
    InvalidConfigValue {
        /// Kind the code was validated against.
        kind: ConfigKind,
        /// Rejected integer code.
        code: u16,
    },

    /// A validated code of the wrong kind was supplied.
    #[error("Configuration kind mismatch: expected {expected}, got {actual}")]
    KindMismatch {
        /// Kind the consumer requires.
        expected: ConfigKind,
        /// Kind actually supplied.
        actual: ConfigKind,
    },

    /// Board configuration file could not be read or parsed.
    #[error("Configuration parse error: {0}")]
    Parse(String),

    /// Board configuration field outside its valid range.
    #[error("Configuration field {field} out of range: {value}")]
    OutOfRange {
        /// Field name.
        field: &'static str,
        /// Offending value.
        value: i64,
    },
}

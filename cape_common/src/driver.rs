//! Board driver trait and factory type.
//!
//! This module defines:
//! - `BoardDriver` trait - Interface for pluggable hardware backends
//! - `DriverFactory` type alias - Factory function type
//!
//! A board driver is the opaque register/bus access layer for one board
//! revision: the runtime never talks to hardware except through it, and the
//! driver never applies policy — state gating, claim tracking, and
//! configuration validation all happen above it in the peripheral registry.

use crate::config::PeripheralConfig;
use crate::error::CapeError;
use crate::peripheral::{PeripheralId, Value};

/// Factory function type for creating driver instances.
pub type DriverFactory = fn() -> Box<dyn BoardDriver>;

/// Trait defining the interface for board drivers.
///
/// The peripheral registry owns exactly one driver instance and serializes
/// all calls into it, so implementations do not need internal locking.
///
/// # Lifecycle
///
/// 1. `init()` - Called once before any peripheral access
/// 2. `read()` / `write()` / `configure()` / `release()` - Per-peripheral access
/// 3. `shutdown()` - Called once during drain, after every release
pub trait BoardDriver: Send {
    /// Returns the driver's unique identifier (e.g., "simulation").
    fn name(&self) -> &'static str;

    /// Returns the driver's semantic version.
    fn version(&self) -> &'static str;

    /// Bring up the hardware (map registers, probe buses).
    ///
    /// # Errors
    /// Return `CapeError::InitFailed` if the board cannot be brought up.
    fn init(&mut self) -> Result<(), CapeError>;

    /// Read the current value of a peripheral.
    ///
    /// Expected to be a bounded, synchronous call. Stateful sensors may
    /// fail with `CapeError::Io` until `configure()` has been applied.
    fn read(&mut self, id: PeripheralId) -> Result<Value, CapeError>;

    /// Write a value to a peripheral.
    ///
    /// Only called for identities with actuation support; the registry
    /// rejects writes to input-only peripherals before reaching the driver.
    fn write(&mut self, id: PeripheralId, value: &Value) -> Result<(), CapeError>;

    /// Apply a validated configuration to a stateful peripheral.
    fn configure(&mut self, id: PeripheralId, config: &PeripheralConfig) -> Result<(), CapeError>;

    /// Return a peripheral to its quiescent state (LED off, sensor idle).
    ///
    /// Called on explicit release and for every claimed peripheral during
    /// drain. Failures are reported by the registry but never abort drain.
    fn release(&mut self, id: PeripheralId) -> Result<(), CapeError>;

    /// Power down the board. Called once, after the registry is drained.
    fn shutdown(&mut self) -> Result<(), CapeError>;
}
